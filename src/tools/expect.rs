//! `// want` expectations for fixture files.
//!
//! A line ending in `// want "re" \`re\`` expects one finding per pattern on that
//! line. Patterns are regular expressions, either double-quoted (with `\\`, `\"`,
//! `\n` and `\t` escapes) or backquoted (taken verbatim). Each finding consumes
//! the first unused pattern on its line that matches its message.

use crate::{audit::report::Finding, language::span::LineIndex};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_till},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, value},
    multi::separated_list1,
    sequence::{delimited, preceded, terminated},
    IResult,
};
use regex::Regex;
use std::fmt;
use thiserror::Error;

const MARKER: &str = "// want";

#[derive(Debug, Error)]
pub enum ExpectError {
    #[error("line {line}: malformed `// want` comment: {text}")]
    Malformed { line: usize, text: String },
    #[error("line {line}: invalid pattern `{pattern}`")]
    InvalidPattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Clone, Debug)]
pub struct Expectation {
    pub line: usize,
    pub patterns: Vec<Regex>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    Unexpected { line: usize, message: String },
    Missing { line: usize, pattern: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Unexpected { line, message } => {
                write!(f, "line {line}: unexpected finding: {message}")
            }
            Mismatch::Missing { line, pattern } => {
                write!(f, "line {line}: no finding matched `{pattern}`")
            }
        }
    }
}

fn backquoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('`'), take_till(|c| c == '`'), char('`')),
        str::to_string,
    )(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn patterns(input: &str) -> IResult<&str, Vec<String>> {
    all_consuming(terminated(
        preceded(
            multispace1,
            separated_list1(multispace1, alt((backquoted, double_quoted))),
        ),
        multispace0,
    ))(input)
}

pub fn parse_expectations(source: &str) -> Result<Vec<Expectation>, ExpectError> {
    let mut expectations = Vec::new();
    for (idx, text) in source.lines().enumerate() {
        let line = idx + 1;
        let Some(at) = text.find(MARKER) else {
            continue;
        };
        let rest = &text[at + MARKER.len()..];
        let (_, raw) = patterns(rest).map_err(|_| ExpectError::Malformed {
            line,
            text: rest.trim().to_string(),
        })?;
        let patterns = raw
            .into_iter()
            .map(|pattern| {
                Regex::new(&pattern).map_err(|source| ExpectError::InvalidPattern {
                    line,
                    pattern,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        expectations.push(Expectation { line, patterns });
    }
    Ok(expectations)
}

/// Matches findings against the expectations in `source`.
pub fn verify(source: &str, findings: &[Finding]) -> Result<Vec<Mismatch>, ExpectError> {
    let index = LineIndex::new(source);
    let mut pending: Vec<(usize, Option<Regex>)> = parse_expectations(source)?
        .into_iter()
        .flat_map(|expectation| {
            let line = expectation.line;
            expectation
                .patterns
                .into_iter()
                .map(move |pattern| (line, Some(pattern)))
        })
        .collect();

    let mut mismatches = Vec::new();
    for finding in findings {
        let line = index.line_of(finding.span.start);
        let matched = pending.iter_mut().find(|(want_line, pattern)| {
            *want_line == line
                && pattern
                    .as_ref()
                    .is_some_and(|pattern| pattern.is_match(&finding.message))
        });
        match matched {
            Some((_, pattern)) => *pattern = None,
            None => mismatches.push(Mismatch::Unexpected {
                line,
                message: finding.message.clone(),
            }),
        }
    }
    for (line, pattern) in pending {
        if let Some(pattern) = pattern {
            mismatches.push(Mismatch::Missing {
                line,
                pattern: pattern.as_str().to_string(),
            });
        }
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audit::report::FindingKind, language::span::Span};

    fn finding(offset: usize, message: &str) -> Finding {
        Finding {
            span: Span::new(offset, offset + 1),
            kind: FindingKind::TypeMismatch,
            message: message.into(),
        }
    }

    #[test]
    fn parses_both_quoting_styles() {
        let source = "x = y // want `a\\.A\\[bool\\]` \"int to \\\"string\\\"\"\n";
        let expectations = parse_expectations(source).expect("expectations parse");
        assert_eq!(expectations.len(), 1);
        let patterns: Vec<&str> = expectations[0].patterns.iter().map(Regex::as_str).collect();
        assert_eq!(patterns, ["a\\.A\\[bool\\]", "int to \"string\""]);
    }

    #[test]
    fn rejects_unquoted_patterns() {
        let err = parse_expectations("x // want nothing quoted\n").expect_err("malformed");
        assert!(matches!(err, ExpectError::Malformed { line: 1, .. }));
    }

    #[test]
    fn rejects_invalid_regex() {
        let err = parse_expectations("x // want `(`\n").expect_err("invalid");
        assert!(matches!(err, ExpectError::InvalidPattern { line: 1, .. }));
    }

    #[test]
    fn each_pattern_is_consumed_once() {
        let source = "a // want `mismatch` `mismatch`\nb\nc // want `other`\n";
        let findings = [
            finding(0, "type mismatch"),
            finding(0, "another mismatch"),
            finding(0, "third mismatch"),
            finding(source.find('b').unwrap_or(0), "stray"),
        ];
        let mismatches = verify(source, &findings).expect("verifies");
        assert_eq!(
            mismatches,
            [
                Mismatch::Unexpected {
                    line: 1,
                    message: "third mismatch".into()
                },
                Mismatch::Unexpected {
                    line: 2,
                    message: "stray".into()
                },
                Mismatch::Missing {
                    line: 3,
                    pattern: "other".into()
                },
            ]
        );
    }
}
