//! String pattern condition

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use super::condition::{ConditionIdentity, ConditionKind, ConditionSpec};
use crate::error::{Error, Result};

/// String comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringOperator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    /// Full-string regular expression match
    Match,
}

impl fmt::Display for StringOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StringOperator::Equal => "EQUAL",
            StringOperator::NotEqual => "NOT_EQUAL",
            StringOperator::StartsWith => "STARTS_WITH",
            StringOperator::EndsWith => "ENDS_WITH",
            StringOperator::Contains => "CONTAINS",
            StringOperator::Match => "MATCH",
        };
        write!(f, "{}", s)
    }
}

/// Compiled `MATCH` pattern, built on first use
///
/// Not part of the definition: clones start empty and every cache compares equal.
#[derive(Debug, Default)]
struct CompiledPattern(OnceLock<Regex>);

impl Clone for CompiledPattern {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub operator: StringOperator,
    pub pattern: String,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(skip)]
    compiled: CompiledPattern,
}

impl StringCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        operator: StringOperator,
        pattern: impl Into<String>,
        ignore_case: bool,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            operator,
            pattern: pattern.into(),
            ignore_case,
            compiled: CompiledPattern::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `Validation` if a `MATCH` pattern is not a valid regular expression.
    pub fn matches(&self, value: &str) -> Result<bool> {
        let (value, pattern): (Cow<'_, str>, Cow<'_, str>) = if self.ignore_case {
            (value.to_lowercase().into(), self.pattern.to_lowercase().into())
        } else {
            (value.into(), self.pattern.as_str().into())
        };

        let matched = match self.operator {
            StringOperator::Equal => value == pattern,
            StringOperator::NotEqual => value != pattern,
            StringOperator::StartsWith => value.starts_with(&*pattern),
            StringOperator::EndsWith => value.ends_with(&*pattern),
            StringOperator::Contains => value.contains(&*pattern),
            StringOperator::Match => self.with_regex(|regex| regex.is_match(&value))?,
        };
        Ok(matched)
    }

    /// Run `f` with the compiled `MATCH` pattern, compiling it on first use
    ///
    /// The cache is keyed by the regex source so a changed `pattern` or
    /// `ignore_case` is never matched with a stale expression.
    fn with_regex<T>(&self, f: impl FnOnce(&Regex) -> T) -> Result<T> {
        let source = format!(
            "{}^(?:{})$",
            if self.ignore_case { "(?i)" } else { "" },
            self.pattern
        );

        if let Some(regex) = self.compiled.0.get().filter(|r| r.as_str() == source) {
            return Ok(f(regex));
        }

        let regex = Regex::new(&source).map_err(|e| {
            Error::validation(format!(
                "condition {} has invalid pattern '{}': {}",
                self.identity.condition_id(),
                self.pattern,
                e
            ))
        })?;
        let result = f(&regex);
        let _ = self.compiled.0.set(regex);
        Ok(result)
    }

    pub fn log(&self, value: &str) -> String {
        format!(
            "String: {}[{}] {} {}{}",
            self.data_id,
            value,
            self.operator,
            self.pattern,
            if self.ignore_case { " (ignoreCase)" } else { "" }
        )
    }
}

impl ConditionSpec for StringCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::String
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str()]
    }

    fn validate(&self) -> Result<()> {
        match self.operator {
            StringOperator::Match => self.with_regex(|_| ()),
            _ => Ok(()),
        }
    }
}
