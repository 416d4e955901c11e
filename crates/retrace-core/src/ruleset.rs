//! Rule files
//!
//! A rule file is JSON: either a bare array of rules or a document with a
//! `rules` array. Order in the file is application order.
//!
//! ```json
//! {
//!   "description": "Delegate image generation to ImageGenerator",
//!   "rules": [
//!     { "name": "drop-batch", "pattern": "\\n  /\\*\\* batch", "until": "\\n  // video",
//!       "mode": "erase-region" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::tracer::{file_tracer, RuleSpec};
use crate::{RetraceError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDocument {
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
    rules: Vec<RuleSpec>,
}

/// Parse rule-file JSON. `origin` is only used in error messages.
pub fn parse_rules(source: &str, origin: impl AsRef<Path>) -> Result<Vec<RuleSpec>> {
    let origin = origin.as_ref();
    let to_error = |source| RetraceError::RuleFile {
        path: origin.to_path_buf(),
        source,
    };

    let value: serde_json::Value = serde_json::from_str(source).map_err(to_error)?;
    let mut specs = if value.is_array() {
        serde_json::from_value::<Vec<RuleSpec>>(value).map_err(to_error)?
    } else {
        serde_json::from_value::<RuleDocument>(value)
            .map_err(to_error)?
            .rules
    };

    if specs.is_empty() {
        return Err(RetraceError::invalid_rule(
            &origin.display().to_string(),
            "rule file defines no rules",
        ));
    }

    for (index, spec) in specs.iter_mut().enumerate() {
        if spec.name.is_empty() {
            spec.name = format!("rule-{}", index + 1);
        }
    }

    Ok(specs)
}

/// Read and parse a rule file
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<RuleSpec>> {
    let path = path.as_ref();
    let source = file_tracer::load(path)?;
    parse_rules(&source, path)
}
