//! Command-line tokenizer.
//!
//! Splits a single command string into an argument vector on unquoted
//! whitespace. Quote characters delimit but never appear in the output, and
//! unbalanced quotes are tolerated. There is no escape character and no shell
//! expansion of any kind.

use std::fmt;

/// How single and double quotes interact while tokenizing.
///
/// The two policies only differ when one kind of quote appears inside the
/// other. For `'it"s a'`:
///
/// - [`QuotePolicy::Independent`] yields `["its a"]`: the `"` opens a second,
///   separate quoted state and the space stays literal.
/// - [`QuotePolicy::Shared`] yields `["its", "a"]`: the `"` closes the state
///   the `'` opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotePolicy {
    /// Each quote kind toggles its own state; whitespace is literal while
    /// either state is active.
    #[default]
    Independent,
    /// Both quote kinds toggle one shared state.
    Shared,
}

/// The quoting policy used when a configuration does not choose one.
pub const DEFAULT_QUOTE_POLICY: QuotePolicy = QuotePolicy::Independent;

impl fmt::Display for QuotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotePolicy::Independent => f.write_str("independent"),
            QuotePolicy::Shared => f.write_str("shared"),
        }
    }
}

#[derive(Default)]
struct QuoteState {
    single: bool,
    double: bool,
}

impl QuoteState {
    fn toggle(&mut self, quote: char, policy: QuotePolicy) {
        match (policy, quote) {
            (QuotePolicy::Independent, '\'') => self.single = !self.single,
            (QuotePolicy::Independent, _) => self.double = !self.double,
            // Shared mode keeps everything in `single`.
            (QuotePolicy::Shared, _) => self.single = !self.single,
        }
    }

    fn active(&self) -> bool {
        self.single || self.double
    }
}

/// Split `cmdline` into tokens.
///
/// An empty string yields an empty vector. A pair of quotes with nothing
/// between them (`''`) produces an empty argument.
///
/// # Example
///
/// ```
/// use promptty::tokenizer::{QuotePolicy, split_command_line};
///
/// let argv = split_command_line(r#"sh -c "echo hi""#, QuotePolicy::Independent);
/// assert_eq!(argv, ["sh", "-c", "echo hi"]);
/// ```
pub fn split_command_line(cmdline: &str, policy: QuotePolicy) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Set once a quote was consumed, so `''` still yields a token.
    let mut pending = false;
    let mut state = QuoteState::default();

    for ch in cmdline.chars() {
        match ch {
            '\'' | '"' => {
                state.toggle(ch, policy);
                pending = true;
            }
            c if c.is_whitespace() && !state.active() => {
                if pending || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => current.push(c),
        }
    }
    if pending || !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
