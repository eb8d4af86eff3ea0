//! Error types returned by the library.
//!
//! Only failures that prevent a run from producing an [`ExecutionResult`] are
//! errors. A timeout or a non-zero exit is an ordinary outcome and is reported
//! through the result instead.
//!
//! [`ExecutionResult`]: crate::ExecutionResult

/// A configuration that must be rejected before any process is started.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("command is required")]
    EmptyCommand,

    #[error("timeout duration must be greater than zero")]
    ZeroTimeout,

    #[error("compile regex \"{pattern}\" failed")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

/// A fatal failure of a single run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to allocate pseudo-terminal")]
    OpenPty(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to start command: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pseudo-terminal I/O failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunError>;
