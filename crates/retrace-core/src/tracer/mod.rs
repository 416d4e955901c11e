/*!
# Tracer - Rule-Driven Text Transformation

Applies an ordered list of pattern/replacement rules to one text buffer.

## Overview

1. **RuleSetApplier**: threads a buffer through every rule in declared order
   and records one `RuleOutcome` per rule
2. **FileTracer**: loads a file, runs the applier, and writes the result back
   only once the whole run succeeded

## Architecture

- `TransformationRule`: trait for anything that rewrites a buffer
- `RegexRule`: the compiled form of a declarative `RuleSpec`
- `ReplacementTemplate`: replacement text with captured-group references
- `RuleSetApplier` / `apply_specs`: the ordered pipeline

## Example Usage

```rust
use retrace_core::tracer::{apply_specs, RuleSpec};

let rules = vec![RuleSpec::first_match("rename", "foo", "bar")];
let rewrite = apply_specs("A\nfoo\nB\nfoo\nC".to_string(), &rules).unwrap();

assert_eq!(rewrite.buffer, "A\nbar\nB\nfoo\nC");
assert!(rewrite.report.all_applied());
```
*/

pub mod applier;
pub mod file_tracer;
pub mod rules;
pub mod template;

// Re-export main types
pub use applier::{apply_specs, Interrupted, Report, Rewrite, RuleOutcome, RuleSetApplier};
pub use file_tracer::{load, save, FileTracer, FileTransformationSummary, WriteMode};
pub use rules::{Mode, RegexRule, Rewritten, RuleSpec, TransformationRule};
pub use template::ReplacementTemplate;

/// Where a buffer being transformed came from
#[derive(Debug, Clone, Default)]
pub struct TransformationContext {
    pub source_file: Option<String>,
}

impl TransformationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_file(mut self, file: String) -> Self {
        self.source_file = Some(file);
        self
    }

    /// Label used in log events
    pub fn source_label(&self) -> &str {
        self.source_file.as_deref().unwrap_or("<buffer>")
    }
}
