//! The record a run hands back to its caller.

use std::time::Duration;

/// Exit code reported when the process did not exit normally (for example
/// when it was killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// Outcome of one run.
///
/// `success` is true only if the process exited with status zero before the
/// deadline. When the deadline fired, `error` describes the expiry and takes
/// precedence over any process-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub success: bool,
    /// Empty on success.
    pub error: String,
    /// Output accumulated up to the prompt boundary, if a prompt pass ran.
    pub prompt: Option<Vec<u8>>,
    /// Whether the stdin payload was written to the terminal.
    pub stdin_written: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
