//! Run configuration.
//!
//! A [`Config`] is built once through [`Config::builder`] and is immutable
//! afterwards. Building validates everything that can be checked without
//! starting a process: the command must tokenize to at least one word, the
//! timeout must be positive and the match rule's regex must compile.

use crate::error::ConfigError;
use crate::rule::{MatchRule, PromptMatcher};
use crate::tokenizer::{DEFAULT_QUOTE_POLICY, QuotePolicy, split_command_line};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the prompt stream must stay quiet before the accumulated output
/// is treated as a complete prompt.
pub const DEFAULT_PROMPT_SETTLE: Duration = Duration::from_millis(50);

/// A validated, immutable description of one run.
#[derive(Debug, Clone)]
pub struct Config {
    command: String,
    argv: Vec<String>,
    timeout: Duration,
    stdin: Option<String>,
    matcher: PromptMatcher,
    quote_policy: QuotePolicy,
    prompt_settle: Duration,
    verbose: bool,
}

impl Config {
    /// Start building a configuration for `command`.
    pub fn builder(command: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
            stdin: None,
            rule: MatchRule::default(),
            quote_policy: DEFAULT_QUOTE_POLICY,
            prompt_settle: DEFAULT_PROMPT_SETTLE,
            verbose: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// The tokenized command; never empty.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The payload to inject, if any. An empty payload is stored as `None`.
    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn matcher(&self) -> &PromptMatcher {
        &self.matcher
    }

    pub fn quote_policy(&self) -> QuotePolicy {
        self.quote_policy
    }

    pub fn prompt_settle(&self) -> Duration {
        self.prompt_settle
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    command: String,
    timeout: Duration,
    stdin: Option<String>,
    rule: MatchRule,
    quote_policy: QuotePolicy,
    prompt_settle: Duration,
    verbose: bool,
}

impl ConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Text written once, followed by a newline, when the rule matches.
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn rule(mut self, rule: MatchRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn quote_policy(mut self, policy: QuotePolicy) -> Self {
        self.quote_policy = policy;
        self
    }

    pub fn prompt_settle(mut self, settle: Duration) -> Self {
        self.prompt_settle = settle;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCommand`] if the command has no words,
    /// [`ConfigError::ZeroTimeout`] for a zero timeout and
    /// [`ConfigError::InvalidRegex`] if the rule's pattern does not compile.
    pub fn build(self) -> Result<Config, ConfigError> {
        let argv = split_command_line(&self.command, self.quote_policy);
        if argv.is_empty() || argv[0].is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let matcher = self.rule.compile()?;
        Ok(Config {
            command: self.command,
            argv,
            timeout: self.timeout,
            stdin: self.stdin.filter(|s| !s.is_empty()),
            matcher,
            quote_policy: self.quote_policy,
            prompt_settle: self.prompt_settle,
            verbose: self.verbose,
        })
    }
}

/// Parse a duration such as `300ms`, `1.5s`, `2m` or `1h30m`.
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare
/// `0` is also accepted.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(invalid()),
        };
        nanos = scaled(number, scale)
            .and_then(|part| nanos.checked_add(part))
            .ok_or_else(invalid)?;
        rest = tail;
    }

    let secs = u64::try_from(nanos / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}

/// `number * scale` in integer arithmetic, with `number` possibly fractional.
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut total = whole.checked_mul(scale)?;
    if !frac.is_empty() {
        // Digits beyond nanosecond precision are dropped.
        let frac = &frac[..frac.len().min(18)];
        let value: u128 = frac.parse().ok()?;
        total = total.checked_add(value.checked_mul(scale)? / 10u128.pow(frac.len() as u32))?;
    }
    Some(total)
}
