//! # Retrace Core
//!
//! Rule-based rewriting of source text, including:
//! - Declarative rule definitions and their compiled form
//! - Replacement templates with captured-group references
//! - The ordered rule-set applier and its per-rule report
//! - Whole-file load and all-or-nothing write-back
//!
//! The engine is text-pattern based on purpose: rules locate constructs such
//! as "a doc comment followed by this method" with multiline regular
//! expressions, so they are sensitive to formatting drift in the target text.
//! The per-rule report exists to make that drift visible.

#![warn(clippy::all)]

pub mod ruleset;
pub mod tracer;

use std::path::PathBuf;

// Re-export commonly used types
pub use ruleset::{load_rules, parse_rules};
pub use tracer::{
    apply_specs, FileTracer, FileTransformationSummary, Interrupted, Mode, RegexRule, Report,
    ReplacementTemplate, Rewrite, RuleOutcome, RuleSetApplier, RuleSpec, TransformationRule,
    WriteMode,
};

/// Retrace version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default upper bound on a single compiled pattern, in bytes.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Initialize tracing for retrace components.
///
/// `RUST_LOG` wins when set; otherwise retrace crates log at `info`, or at
/// `debug` when `verbose` is true. Output goes to stderr so stdout stays
/// reserved for results.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("retrace_core={level},retrace_cli={level}"))
    });

    // A subscriber may already be installed (tests, embedding callers).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Number of lines in a buffer, counted the way `str::lines` does: a final
/// line terminator does not start a new line, `\r\n` counts once, and a lone
/// `\r` does not end a line.
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Run configuration for file rewriting
#[derive(Debug, Clone)]
pub struct RetraceConfig {
    /// How the final buffer is written back
    pub write_mode: WriteMode,
    /// Copy the original to `<file>.bak` before overwriting it
    pub backup: bool,
    /// Apply rules and report, but never write
    pub dry_run: bool,
    /// Treat any rule that did not apply as a fatal error
    pub strict: bool,
    /// Write to this path instead of overwriting the input
    pub output: Option<PathBuf>,
    /// Compiled size limit passed to the regex engine
    pub regex_size_limit: usize,
}

impl Default for RetraceConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::InPlace,
            backup: false,
            dry_run: false,
            strict: false,
            output: None,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

/// Error types for retrace operations
#[derive(thiserror::Error, Debug)]
pub enum RetraceError {
    /// Input missing or unreadable, or output unwritable
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rule's pattern failed to compile
    #[error("Pattern error in rule '{rule}': {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// A rule's replacement template is malformed
    #[error("Template error in rule '{rule}': {message}")]
    Template { rule: String, message: String },

    /// A rule is structurally invalid
    #[error("Invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// The rule file is not valid JSON or does not describe rules
    #[error("Rule file {}: {source}", .path.display())]
    RuleFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Strict mode: some rules matched nothing
    #[error("Rules did not apply: {}", .rules.join(", "))]
    Unapplied { rules: Vec<String> },
}

impl RetraceError {
    /// Create an I/O error bound to the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a template error for the named rule
    pub fn template(rule: &str, message: impl Into<String>) -> Self {
        Self::Template {
            rule: rule.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid-rule error for the named rule
    pub fn invalid_rule(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for retrace operations
pub type Result<T> = std::result::Result<T, RetraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("one"), 1);
        assert_eq!(line_count("one\n"), 1);
        assert_eq!(line_count("one\ntwo"), 2);
        assert_eq!(line_count("one\r\ntwo\r\n"), 2);
        assert_eq!(line_count("\n\n"), 2);
        // A lone carriage return is not a line break
        assert_eq!(line_count("one\rtwo"), 1);
        assert_eq!(line_count("one\rtwo\n"), 1);
    }

    #[test]
    fn test_error_messages_name_the_rule() {
        let err = RetraceError::invalid_rule("strip-helper", "erase-region rules cannot have a replacement");
        assert_eq!(
            err.to_string(),
            "Invalid rule 'strip-helper': erase-region rules cannot have a replacement"
        );

        let err = RetraceError::Unapplied {
            rules: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Rules did not apply: a, b");
    }

    #[test]
    fn test_default_config() {
        let config = RetraceConfig::default();
        assert_eq!(config.write_mode, WriteMode::InPlace);
        assert!(!config.dry_run);
        assert!(!config.strict);
        assert!(config.output.is_none());
        assert_eq!(config.regex_size_limit, DEFAULT_REGEX_SIZE_LIMIT);
    }
}
