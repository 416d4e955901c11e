/*!
# RuleSet Applier

Threads one buffer through an ordered list of rules. The output of rule *i*
is the input of rule *i + 1*; nothing runs out of order and nothing is
retried.
*/

use std::borrow::Cow;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use super::rules::{RegexRule, Rewritten, RuleSpec, TransformationRule};
use super::TransformationContext;
use crate::{RetraceError, Result, DEFAULT_REGEX_SIZE_LIMIT};

/// What one rule did to the buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule_index: usize,
    pub rule_name: String,
    pub match_count: usize,
    pub applied: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub unterminated: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Per-rule outcomes of one run, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    outcomes: Vec<RuleOutcome>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: RuleOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// Rules that matched nothing
    pub fn unapplied(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.applied)
    }

    pub fn all_applied(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.applied)
    }

    pub fn total_matches(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.match_count).sum()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Fail with the names of every rule that did not apply
    pub fn require_all_applied(&self) -> Result<()> {
        let rules: Vec<String> = self
            .unapplied()
            .map(|outcome| outcome.rule_name.clone())
            .collect();
        if rules.is_empty() {
            Ok(())
        } else {
            Err(RetraceError::Unapplied { rules })
        }
    }
}

/// Final buffer plus report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub buffer: String,
    pub report: Report,
}

/// A rule failed to compile partway through `apply_specs`.
///
/// `rewrite` holds the buffer and report produced by the rules before it;
/// those rules keep their effect.
#[derive(Debug, thiserror::Error)]
#[error("run stopped at rule {rule_index}: {error}")]
pub struct Interrupted {
    pub rule_index: usize,
    pub rewrite: Rewrite,
    #[source]
    pub error: RetraceError,
}

/// Ordered rule pipeline over a single buffer
#[derive(Default)]
pub struct RuleSetApplier {
    rules: Vec<Box<dyn TransformationRule>>,
}

impl RuleSetApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every spec up front; fails on the first bad rule
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        Self::from_specs_with_limit(specs, DEFAULT_REGEX_SIZE_LIMIT)
    }

    pub fn from_specs_with_limit(specs: &[RuleSpec], size_limit: usize) -> Result<Self> {
        let mut applier = Self::new();
        for spec in specs {
            applier.add_rule(Box::new(RegexRule::compile_with_limit(spec, size_limit)?));
        }
        Ok(applier)
    }

    /// Append a rule; it runs after every rule added before it
    pub fn add_rule(&mut self, rule: Box<dyn TransformationRule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name())
    }

    pub fn apply(&self, buffer: String) -> Rewrite {
        self.apply_with_context(buffer, &TransformationContext::new())
    }

    pub fn apply_with_context(&self, buffer: String, context: &TransformationContext) -> Rewrite {
        let mut rewrite = Rewrite {
            buffer,
            report: Report::new(),
        };

        for (index, rule) in self.rules.iter().enumerate() {
            apply_rule(rule.as_ref(), index, &mut rewrite, context);
        }

        debug!(
            source = context.source_label(),
            rules = rewrite.report.len(),
            matches = rewrite.report.total_matches(),
            "rule set applied"
        );
        rewrite
    }
}

/// Compile and apply each spec in turn.
///
/// Every step commits before the next rule is compiled, so a bad rule stops
/// the run without undoing the rules already applied.
pub fn apply_specs(buffer: String, specs: &[RuleSpec]) -> std::result::Result<Rewrite, Interrupted> {
    apply_specs_with(buffer, specs, DEFAULT_REGEX_SIZE_LIMIT, &TransformationContext::new())
}

pub fn apply_specs_with(
    buffer: String,
    specs: &[RuleSpec],
    size_limit: usize,
    context: &TransformationContext,
) -> std::result::Result<Rewrite, Interrupted> {
    let mut rewrite = Rewrite {
        buffer,
        report: Report::new(),
    };

    for (index, spec) in specs.iter().enumerate() {
        let rule = match RegexRule::compile_with_limit(spec, size_limit) {
            Ok(rule) => rule,
            Err(error) => {
                return Err(Interrupted {
                    rule_index: index,
                    rewrite,
                    error,
                })
            }
        };
        apply_rule(&rule, index, &mut rewrite, context);
    }

    Ok(rewrite)
}

fn apply_rule(
    rule: &dyn TransformationRule,
    index: usize,
    rewrite: &mut Rewrite,
    context: &TransformationContext,
) {
    let start_time = Instant::now();
    debug!(rule = rule.name(), index, "applying {}", rule.description());

    let Rewritten {
        text,
        match_count,
        unterminated,
    } = rule.rewrite(&rewrite.buffer, context);
    let replaced = match text {
        Cow::Owned(text) => Some(text),
        Cow::Borrowed(_) => None,
    };
    if let Some(text) = replaced {
        rewrite.buffer = text;
    }

    if unterminated > 0 {
        warn!(
            rule = rule.name(),
            source = context.source_label(),
            "region start found but its terminator never appears; left untouched"
        );
    }
    if match_count == 0 {
        warn!(
            rule = rule.name(),
            source = context.source_label(),
            "rule matched nothing"
        );
    }
    debug!(
        rule = rule.name(),
        matches = match_count,
        elapsed_us = start_time.elapsed().as_micros() as u64,
        "rule finished"
    );

    rewrite.report.push(RuleOutcome {
        rule_index: index,
        rule_name: rule.name().to_string(),
        match_count,
        applied: match_count > 0,
        unterminated,
    });
}
