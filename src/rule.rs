//! Prompt match rules.
//!
//! A [`MatchRule`] is the user-facing description: four optional conditions
//! that must all hold for the stdin payload to be written. Compiling it into a
//! [`PromptMatcher`] validates the regular expression up front, so a bad
//! pattern is reported before any process starts.

use crate::error::ConfigError;
use regex::Regex;

/// Conjunction of up to four conditions over the prompt text.
///
/// An empty field is vacuously true, so the default rule matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRule {
    pub starts_with: String,
    pub ends_with: String,
    pub contains: String,
    /// Searched anywhere in the text, not anchored.
    pub regex: String,
}

impl MatchRule {
    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = prefix.into();
        self
    }

    pub fn ends_with(mut self, suffix: impl Into<String>) -> Self {
        self.ends_with = suffix.into();
        self
    }

    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = needle.into();
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = pattern.into();
        self
    }

    /// True when no condition is set.
    pub fn is_empty(&self) -> bool {
        self.starts_with.is_empty()
            && self.ends_with.is_empty()
            && self.contains.is_empty()
            && self.regex.is_empty()
    }

    /// Validate the rule and compile its regular expression.
    pub fn compile(&self) -> Result<PromptMatcher, ConfigError> {
        let regex = if self.regex.is_empty() {
            None
        } else {
            Some(
                Regex::new(&self.regex).map_err(|source| ConfigError::InvalidRegex {
                    pattern: self.regex.clone(),
                    source,
                })?,
            )
        };
        Ok(PromptMatcher {
            rule: self.clone(),
            regex,
        })
    }
}

/// A validated [`MatchRule`] ready for evaluation.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    rule: MatchRule,
    regex: Option<Regex>,
}

impl PromptMatcher {
    pub fn rule(&self) -> &MatchRule {
        &self.rule
    }

    /// Evaluate every non-empty condition against `text`.
    pub fn matches(&self, text: &str) -> bool {
        let rule = &self.rule;
        (rule.starts_with.is_empty() || text.starts_with(&rule.starts_with))
            && (rule.ends_with.is_empty() || text.ends_with(&rule.ends_with))
            && (rule.contains.is_empty() || text.contains(&rule.contains))
            && self.regex.as_ref().is_none_or(|re| re.is_match(text))
    }
}
