/*!
# Replacement Templates

Replacement text that may re-emit groups captured by the rule's pattern.
References use the backslash forms only; `$` is an ordinary character, so
template literals such as `` `${id}` `` in the target language pass through
as written.

| Syntax                 | Meaning                                       |
|------------------------|-----------------------------------------------|
| `\1`, `\12`            | positional group (two digits at most)         |
| `\g<1>`, `\g<name>`    | positional or named group                     |
| `\g<0>`                | the whole replaced region                     |
| `\0`, `\012`, `\101`   | octal character code (`\0` is NUL)            |
| `\\`                   | literal `\`                                   |
| `\n`, `\t`, `\r`       | newline, tab, carriage return                 |
| `\a`, `\b`, `\f`, `\v` | bell, backspace, form feed, vertical tab      |
| `\&`, `\.`, `\{`, ...  | kept as written, backslash included           |

A backslash before any other ASCII letter is an error. Every group reference
is resolved against the compiled pattern when the template is parsed, and a
group that did not participate in the match expands to empty text.
*/

use std::iter::Peekable;
use std::str::CharIndices;

use regex::{Captures, Regex};

use crate::{RetraceError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(usize),
}

/// A parsed replacement template, bound to one compiled pattern
#[derive(Debug, Clone)]
pub struct ReplacementTemplate {
    segments: Vec<Segment>,
}

impl ReplacementTemplate {
    /// Parse `template` for the rule named `rule`, validating every group
    /// reference against `pattern`.
    pub fn parse(rule: &str, template: &str, pattern: &Regex) -> Result<Self> {
        let mut parser = TemplateParser {
            rule,
            pattern,
            chars: template.char_indices().peekable(),
            segments: Vec::new(),
            literal: String::new(),
        };
        parser.run()?;

        Ok(Self {
            segments: parser.segments,
        })
    }

    /// True when the template expands to nothing (a deletion)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append the expansion for one match to `out`. `region` is the full text
    /// being replaced, which group 0 resolves to.
    pub fn expand(&self, caps: &Captures<'_>, region: &str, out: &mut String) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(0) => out.push_str(region),
                Segment::Group(index) => {
                    if let Some(group) = caps.get(*index) {
                        out.push_str(group.as_str());
                    }
                }
            }
        }
    }
}

struct TemplateParser<'a> {
    rule: &'a str,
    pattern: &'a Regex,
    chars: Peekable<CharIndices<'a>>,
    segments: Vec<Segment>,
    literal: String,
}

impl TemplateParser<'_> {
    fn run(&mut self) -> Result<()> {
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '\\' => self.backslash(offset)?,
                other => self.literal.push(other),
            }
        }
        self.flush_literal();
        Ok(())
    }

    fn backslash(&mut self, offset: usize) -> Result<()> {
        let Some((_, escaped)) = self.chars.next() else {
            return Err(RetraceError::template(self.rule, "trailing backslash"));
        };

        match escaped {
            '\\' => self.literal.push('\\'),
            'n' => self.literal.push('\n'),
            't' => self.literal.push('\t'),
            'r' => self.literal.push('\r'),
            'a' => self.literal.push('\x07'),
            'b' => self.literal.push('\x08'),
            'f' => self.literal.push('\x0c'),
            'v' => self.literal.push('\x0b'),
            '0' => {
                let mut digits = String::from('0');
                for _ in 0..2 {
                    match self.next_if(is_octal_digit) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                self.push_octal(&digits, offset)?;
            }
            d if d.is_ascii_digit() => {
                let mut digits = d.to_string();
                if let Some(next) = self.next_if(|c| c.is_ascii_digit()) {
                    digits.push(next);
                    if is_octal_digit(d) && is_octal_digit(next) {
                        if let Some(third) = self.next_if(is_octal_digit) {
                            digits.push(third);
                            return self.push_octal(&digits, offset);
                        }
                    }
                }
                self.push_reference(&digits)?;
            }
            'g' => {
                if self.next_if(|c| c == '<').is_none() {
                    return Err(RetraceError::template(
                        self.rule,
                        format!("expected '<' after \\g at offset {offset}"),
                    ));
                }
                let name = self.read_until('>', "\\g<")?;
                self.push_reference(&name)?;
            }
            letter if letter.is_ascii_alphabetic() => {
                return Err(RetraceError::template(
                    self.rule,
                    format!("bad escape \\{letter} at offset {offset}"),
                ));
            }
            other => {
                self.literal.push('\\');
                self.literal.push(other);
            }
        }
        Ok(())
    }

    fn next_if(&mut self, accept: impl Fn(char) -> bool) -> Option<char> {
        self.chars.next_if(|&(_, c)| accept(c)).map(|(_, c)| c)
    }

    fn push_octal(&mut self, digits: &str, offset: usize) -> Result<()> {
        let code = u32::from_str_radix(digits, 8)
            .ok()
            .filter(|code| *code <= 0o377)
            .and_then(char::from_u32)
            .ok_or_else(|| {
                RetraceError::template(
                    self.rule,
                    format!("octal escape value \\{digits} outside of range 0-0o377 at offset {offset}"),
                )
            })?;
        self.literal.push(code);
        Ok(())
    }

    fn read_until(&mut self, close: char, opener: &str) -> Result<String> {
        let mut name = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == close {
                return Ok(name);
            }
            name.push(c);
        }
        Err(RetraceError::template(
            self.rule,
            format!("unterminated group reference {opener}{name}"),
        ))
    }

    fn push_reference(&mut self, name: &str) -> Result<()> {
        let index = self.resolve(name)?;
        self.flush_literal();
        self.segments.push(Segment::Group(index));
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        if name.is_empty() {
            return Err(RetraceError::template(self.rule, "empty group reference"));
        }

        if name.bytes().all(|b| b.is_ascii_digit()) {
            let index: usize = name
                .parse()
                .map_err(|_| RetraceError::template(self.rule, format!("invalid group {name}")))?;
            if index >= self.pattern.captures_len() {
                return Err(RetraceError::template(
                    self.rule,
                    format!(
                        "reference to group {index}, but the pattern has {} group(s)",
                        self.pattern.captures_len() - 1
                    ),
                ));
            }
            return Ok(index);
        }

        self.pattern
            .capture_names()
            .position(|candidate| candidate == Some(name))
            .ok_or_else(|| RetraceError::template(self.rule, format!("unknown group name '{name}'")))
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.segments
                .push(Segment::Literal(std::mem::take(&mut self.literal)));
        }
    }
}

fn is_octal_digit(c: char) -> bool {
    ('0'..='7').contains(&c)
}
