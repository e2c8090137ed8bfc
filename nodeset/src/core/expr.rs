//! Match-expression evaluation.
//!
//! A match expression is either a literal, a plain regex, or an explicit
//! `/regex/`. Plain expressions that fail to compile fall back to literal
//! equality; explicit ones report the compile error.
//!
//! [`ScalarExpr`] and [`SetExpr`] are the compiled forms, built once and then
//! matched against any number of values.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::trace;

use crate::error::SelectionError;

/// How a map of attribute selectors combines per-key results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every selector entry must match.
    All,
    /// At least one selector entry must match.
    Any,
}

/// True if `value` is empty or only whitespace.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone)]
enum Matcher {
    Explicit(Regex),
    Implicit {
        regex: Option<Regex>,
        literal: String,
    },
}

impl Matcher {
    fn compile(expression: &str) -> Result<Self, regex::Error> {
        if let Some(pattern) = explicit_pattern(expression) {
            return Ok(Self::Explicit(full_match_regex(pattern)?));
        }
        let literal = expression.trim();
        let regex = match full_match_regex(literal) {
            Ok(regex) => Some(regex),
            Err(err) => {
                trace!(expression = literal, error = %err, "not a regex, comparing literally");
                None
            }
        };
        Ok(Self::Implicit {
            regex,
            literal: literal.to_string(),
        })
    }

    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Explicit(regex) => regex.is_match(value),
            Self::Implicit { regex, literal } => {
                regex.as_ref().is_some_and(|regex| regex.is_match(value)) || literal == value
            }
        }
    }
}

/// Inner pattern of a `/.../` expression, trimmed.
fn explicit_pattern(expression: &str) -> Option<&str> {
    if expression.len() >= 2 && expression.starts_with('/') && expression.ends_with('/') {
        Some(expression[1..expression.len() - 1].trim())
    } else {
        None
    }
}

/// Compile `pattern` so that it only matches whole strings.
fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    // Compile unanchored first so a pattern cannot close the wrapping group.
    Regex::new(pattern)?;
    Regex::new(&format!(r"\A(?:{pattern})\z"))
}

/// Compiled scalar expression for hostname, name, the OS fields and
/// attribute values.
#[derive(Debug, Clone)]
pub struct ScalarExpr {
    /// `None` for a blank expression, which matches nothing.
    compiled: Option<(Matcher, Vec<String>)>,
}

impl ScalarExpr {
    pub fn compile(expression: &str) -> Result<Self, regex::Error> {
        if is_blank(expression) {
            return Ok(Self { compiled: None });
        }
        let alternatives = expression.split(',').map(str::to_string).collect();
        Ok(Self {
            compiled: Some((Matcher::compile(expression)?, alternatives)),
        })
    }

    /// Blank values never match. Besides the regex/literal test, the value
    /// may equal one of the comma-separated alternatives exactly.
    pub fn is_match(&self, value: &str) -> bool {
        let Some((matcher, alternatives)) = &self.compiled else {
            return false;
        };
        if is_blank(value) {
            return false;
        }
        matcher.is_match(value) || alternatives.iter().any(|alt| alt == value)
    }
}

/// One `+` term of a set expression.
#[derive(Debug, Clone)]
struct Term {
    text: String,
    matcher: Matcher,
}

impl Term {
    fn compile(text: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            text: text.to_string(),
            matcher: Matcher::compile(text)?,
        })
    }

    fn matches_any<S: AsRef<str>>(&self, values: &[S]) -> bool {
        values
            .iter()
            .any(|value| value.as_ref() == self.text || self.matcher.is_match(value.as_ref()))
    }
}

/// Compiled set expression for tags.
///
/// `+` joins terms that must all be present, `,` separates alternative
/// clauses: `"a+b,c"` matches a set holding both `a` and `b`, or holding `c`.
#[derive(Debug, Clone)]
pub struct SetExpr {
    clauses: Vec<Vec<Term>>,
}

impl SetExpr {
    pub fn compile(expression: &str) -> Result<Self, regex::Error> {
        if is_blank(expression) {
            return Ok(Self {
                clauses: Vec::new(),
            });
        }
        if !expression.contains([',', '+']) {
            return Ok(Self {
                clauses: vec![vec![Term::compile(expression)?]],
            });
        }
        let mut clauses = Vec::new();
        for clause in expression.split(',') {
            let mut terms: Vec<&str> = clause.split('+').collect();
            // Trailing empty terms are dropped, so `a+` means `a`. Leading and
            // interior ones stay and only match an empty value.
            while terms.last().is_some_and(|term| term.is_empty()) {
                terms.pop();
            }
            // A clause without terms would match every set.
            if terms.is_empty() {
                continue;
            }
            let terms = terms
                .into_iter()
                .map(|term| Term::compile(term.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(terms);
        }
        Ok(Self { clauses })
    }

    /// An empty set never matches.
    pub fn is_match<S: AsRef<str>>(&self, values: &[S]) -> bool {
        !values.is_empty()
            && self
                .clauses
                .iter()
                .any(|terms| terms.iter().all(|term| term.matches_any(values)))
    }
}

/// Test `value` against `expression` as a full-string regex or a literal.
///
/// `/.../` expressions are regex-only and return `Err` if they do not compile.
/// Any other expression is tried as a regex (compile errors are ignored) and
/// then compared for equality after trimming.
pub fn match_regex_or_equals(expression: &str, value: &str) -> Result<bool, regex::Error> {
    Ok(Matcher::compile(expression)?.is_match(value))
}

/// Scalar matcher used for hostname, name and the OS fields.
///
/// Blank expressions and blank values never match.
pub fn matches_input(expression: &str, value: &str) -> Result<bool, regex::Error> {
    if is_blank(value) || is_blank(expression) {
        return Ok(false);
    }
    Ok(ScalarExpr::compile(expression)?.is_match(value))
}

/// Set matcher used for tags. See [`SetExpr`].
pub fn matches_input_set<S: AsRef<str>>(
    expression: &str,
    values: &[S],
) -> Result<bool, regex::Error> {
    if values.is_empty() || is_blank(expression) {
        return Ok(false);
    }
    Ok(SetExpr::compile(expression)?.is_match(values))
}

/// Match a map of attribute selectors against a node's attributes.
///
/// A key missing from `values` is a non-match for that key. With
/// [`MatchMode::All`] an empty selector map matches; with [`MatchMode::Any`]
/// it does not.
pub fn matches_attributes(
    selectors: &BTreeMap<String, String>,
    values: &BTreeMap<String, String>,
    mode: MatchMode,
) -> Result<bool, SelectionError> {
    for (key, expression) in selectors {
        let matched = match values.get(key) {
            Some(value) => matches_input(expression, value)
                .map_err(|err| SelectionError::invalid_pattern(key, expression, err))?,
            None => false,
        };
        match (mode, matched) {
            (MatchMode::All, false) => return Ok(false),
            (MatchMode::Any, true) => return Ok(true),
            _ => {}
        }
    }
    Ok(mode == MatchMode::All)
}
