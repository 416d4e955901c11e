/*!
# Transformation Rules

Core trait, declarative rule definitions and their compiled regex form.
*/

use std::borrow::Cow;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::template::ReplacementTemplate;
use super::TransformationContext;
use crate::{RetraceError, Result, DEFAULT_REGEX_SIZE_LIMIT};

/// Core trait for transformation rules
///
/// A rule rewrites one buffer and says how many regions it replaced. It never
/// fails at application time: anything that can go wrong (a bad pattern, a
/// bad template) is rejected when the rule is built.
pub trait TransformationRule: Send + Sync {
    /// Human-readable name for this rule, used in reports and logs
    fn name(&self) -> &str;

    /// Short description of what this rule does
    fn description(&self) -> String {
        String::new()
    }

    /// Apply the rule to `buffer`
    fn rewrite<'a>(&self, buffer: &'a str, context: &TransformationContext) -> Rewritten<'a>;
}

/// Result of one rule application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten<'a> {
    /// The new buffer; borrowed when nothing was replaced
    pub text: Cow<'a, str>,
    /// Number of regions replaced
    pub match_count: usize,
    /// Regions whose terminator never appeared and were left alone
    pub unterminated: usize,
}

impl<'a> Rewritten<'a> {
    pub fn unchanged(buffer: &'a str) -> Self {
        Self {
            text: Cow::Borrowed(buffer),
            match_count: 0,
            unterminated: 0,
        }
    }
}

/// Replacement policy of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Replace only the leftmost match
    #[default]
    #[serde(alias = "first-match-only")]
    FirstMatch,
    /// Replace every match with the expanded template
    ReplaceAll,
    /// Delete every match
    EraseRegion,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::FirstMatch => "first-match",
            Mode::ReplaceAll => "replace-all",
            Mode::EraseRegion => "erase-region",
        })
    }
}

/// Declarative rule, as written in a rule file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default)]
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub mode: Mode,
    /// Terminator: each region ends right before the first match of this
    /// pattern that follows the start match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            mode,
            ..Default::default()
        }
    }

    pub fn first_match(
        name: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(name, pattern, Mode::FirstMatch).with_replacement(replacement)
    }

    pub fn replace_all(
        name: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(name, pattern, Mode::ReplaceAll).with_replacement(replacement)
    }

    pub fn erase_region(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(name, pattern, Mode::EraseRegion)
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    /// Name used in reports
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed>"
        } else {
            &self.name
        }
    }
}

/// A compiled rule: multiline, dot-matches-newline pattern plus template
#[derive(Debug, Clone)]
pub struct RegexRule {
    name: String,
    pattern: Regex,
    until: Option<Regex>,
    template: ReplacementTemplate,
    mode: Mode,
}

impl RegexRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        Self::compile_with_limit(spec, DEFAULT_REGEX_SIZE_LIMIT)
    }

    pub fn compile_with_limit(spec: &RuleSpec, size_limit: usize) -> Result<Self> {
        let name = spec.display_name().to_string();

        let pattern = build_regex(&spec.pattern, size_limit).map_err(|source| {
            RetraceError::Pattern {
                rule: name.clone(),
                source,
            }
        })?;

        let until = spec
            .until
            .as_deref()
            .map(|until| build_regex(until, size_limit))
            .transpose()
            .map_err(|source| RetraceError::Pattern {
                rule: name.clone(),
                source,
            })?;

        if spec.mode == Mode::EraseRegion && !spec.replacement.is_empty() {
            return Err(RetraceError::invalid_rule(
                &name,
                "erase-region rules cannot have a replacement",
            ));
        }

        let template = ReplacementTemplate::parse(&name, &spec.replacement, &pattern)?;

        Ok(Self {
            name,
            pattern,
            until,
            template,
            mode: spec.mode,
        })
    }
}

impl TransformationRule for RegexRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        match &self.until {
            Some(until) => format!("{} /{}/ until /{}/", self.mode, self.pattern, until),
            None => format!("{} /{}/", self.mode, self.pattern),
        }
    }

    fn rewrite<'a>(&self, buffer: &'a str, _context: &TransformationContext) -> Rewritten<'a> {
        let mut output = String::new();
        let mut copied_to = 0;
        let mut match_count = 0;
        let mut unterminated = 0;
        let mut search_from = 0;

        while search_from <= buffer.len() {
            let Some(caps) = self.pattern.captures_at(buffer, search_from) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };

            let end = match &self.until {
                None => whole.end(),
                Some(until) => match until.find_at(buffer, whole.end()) {
                    Some(stop) => stop.start(),
                    None => {
                        unterminated += 1;
                        break;
                    }
                },
            };

            output.push_str(&buffer[copied_to..whole.start()]);
            if !self.template.is_empty() {
                self.template
                    .expand(&caps, &buffer[whole.start()..end], &mut output);
            }
            copied_to = end;
            match_count += 1;

            if self.mode == Mode::FirstMatch {
                break;
            }

            search_from = if end > whole.start() {
                end
            } else {
                // Empty region: step over one character
                buffer[end..]
                    .chars()
                    .next()
                    .map_or(buffer.len() + 1, |c| end + c.len_utf8())
            };
        }

        if match_count == 0 {
            return Rewritten {
                unterminated,
                ..Rewritten::unchanged(buffer)
            };
        }

        output.push_str(&buffer[copied_to..]);
        Rewritten {
            text: Cow::Owned(output),
            match_count,
            unterminated,
        }
    }
}

/// Compile with multiline and dot-matches-newline semantics
fn build_regex(pattern: &str, size_limit: usize) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .dot_matches_new_line(true)
        .size_limit(size_limit)
        .build()
}
