//! # Promptty
//!
//! Run one command inside a pseudo-terminal, bounded by a deadline, and
//! answer its first prompt.
//!
//! Many CLI tools only ask for a password or a confirmation when they talk to
//! a terminal. Promptty gives the command a PTY as its stdin and controlling
//! terminal, captures stdout and stderr byte for byte, waits for the first
//! pause in its output, and if that output satisfies a [`MatchRule`] writes a
//! single line of input. It then waits for the command to exit or for the
//! timeout to fire, and reports everything in an [`ExecutionResult`].
//!
//! ## Quick start
//!
//! ```no_run
//! use promptty::{Config, MatchRule};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::builder("sudo -k -S true")
//!         .timeout(Duration::from_secs(10))
//!         .stdin("hunter2")
//!         .rule(MatchRule::default().contains("password"))
//!         .build()?;
//!
//!     let result = promptty::run(&config).await?;
//!     println!("exit {} success {}", result.exit_code, result.success);
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! | Situation | `success` | `error` | `exit_code` |
//! |-----------|-----------|---------|-------------|
//! | exited 0 in time | `true` | empty | `0` |
//! | exited non-zero | `false` | `exit status: N` | `N` |
//! | killed by a signal | `false` | `signal: ...` | `-1` |
//! | deadline fired | `false` | `deadline exceeded after ...` | whatever the process reached |
//!
//! Only an invalid configuration or a failure to start the process is
//! returned as an `Err`.
//!
//! ## Match rules
//!
//! A rule has four optional conditions: `starts_with`, `ends_with`,
//! `contains` and `regex`. Empty conditions are ignored and the rule holds
//! when every remaining condition holds, so an empty rule answers any prompt.
//! The regex is compiled when the [`Config`] is built.

pub(crate) mod capture;
pub mod config;
pub mod error;
pub mod output;
pub(crate) mod prompt;
pub(crate) mod pty;
pub(crate) mod pty_reader;
pub mod result;
pub mod rule;
pub mod runner;
pub mod tokenizer;

pub use config::{Config, ConfigBuilder, parse_duration};
pub use error::{ConfigError, RunError};
pub use result::ExecutionResult;
pub use rule::{MatchRule, PromptMatcher};
pub use runner::{Runner, run};
pub use tokenizer::{DEFAULT_QUOTE_POLICY, QuotePolicy, split_command_line};
