//! The process runner.
//!
//! A run moves through `Starting`, an optional `AwaitingPrompt`, `Waiting`
//! and `Done`. The prompt exchange runs as its own task while the main flow
//! waits for the child, and both must finish before the outcome is
//! reconciled. Everything is bounded by a single deadline derived from the
//! configured timeout; when it fires the child's process group is killed.

use crate::capture::{self, CaptureBuffer};
use crate::config::Config;
use crate::error::Result;
use crate::prompt::{PromptExchange, PromptOutcome};
use crate::pty::PtySession;
use crate::pty_reader::spawn_reader;
use crate::result::{ExecutionResult, NO_EXIT_CODE};
use std::fmt;
use std::io::{self, Write};
use std::process::ExitStatus;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Minimum time allowed for the output pipes to drain after the child exits.
const CAPTURE_GRACE: Duration = Duration::from_millis(100);

/// Lifecycle of a run, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    AwaitingPrompt,
    Waiting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::AwaitingPrompt => "awaiting-prompt",
            Phase::Waiting => "waiting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

type PromptTask = JoinHandle<(PromptOutcome, Box<dyn Write + Send>)>;

/// Executes one [`Config`] per call to [`Runner::run`].
///
/// Runs share nothing: each owns its terminal, buffers and deadline.
pub struct Runner<'a> {
    config: &'a Config,
    phase: Phase,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Runner {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    /// Run the command once.
    ///
    /// # Errors
    ///
    /// Only a failure to allocate the terminal or start the process is an
    /// error. Timeouts and failing exit statuses are reported through the
    /// returned [`ExecutionResult`].
    pub async fn run(&mut self) -> Result<ExecutionResult> {
        let config = self.config;
        let started = Instant::now();
        let deadline = started + config.timeout();

        self.enter(Phase::Starting);
        debug!(argv = ?config.argv(), timeout = ?config.timeout(), "starting command");
        let (mut session, stdout, stderr) = PtySession::spawn(config.argv())?;

        let stdout_buf = CaptureBuffer::default();
        let stderr_buf = CaptureBuffer::default();

        let (tee, prompt_task, terminal_reader) = match config.stdin() {
            Some(payload) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let reader = spawn_reader(session.reader()?, tx.clone(), config.verbose());
                let writer = session.take_writer()?;
                let exchange = PromptExchange::new(
                    config.matcher().clone(),
                    payload,
                    config.prompt_settle(),
                    deadline,
                );
                let task: PromptTask = tokio::spawn(exchange.run(rx, writer));
                self.enter(Phase::AwaitingPrompt);
                (Some(tx), Some(task), Some(reader))
            }
            None => (None, None, None),
        };

        let readers = [
            capture::spawn_capture(stdout, stdout_buf.clone(), tee.clone(), config.verbose()),
            capture::spawn_capture(stderr, stderr_buf.clone(), tee, config.verbose()),
        ];

        self.enter(Phase::Waiting);
        let ((status, killed), prompt) = tokio::join!(
            wait_until(&mut session, deadline),
            finish_prompt(prompt_task)
        );
        let expired = killed || Instant::now() >= deadline;

        // Held until the child is reaped, see `PtySession::take_writer`.
        let (outcome, writer) = prompt.unzip();
        drop(writer);

        drain(readers, deadline).await;
        drop(session);
        release_terminal_reader(terminal_reader);

        self.enter(Phase::Done);
        let result = reconcile(
            status,
            expired,
            config.timeout(),
            Captured {
                stdout: capture::take(&stdout_buf),
                stderr: capture::take(&stderr_buf),
                prompt: outcome,
                elapsed: started.elapsed(),
            },
        );
        debug!(
            exit_code = result.exit_code,
            success = result.success,
            timed_out = result.timed_out,
            elapsed = ?result.elapsed,
            "run finished"
        );
        Ok(result)
    }
}

/// Run `config` once. Shorthand for `Runner::new(config).run()`.
pub async fn run(config: &Config) -> Result<ExecutionResult> {
    Runner::new(config).run().await
}

/// Wait for the child, killing its process group if the deadline passes
/// first. The flag reports whether the kill happened.
async fn wait_until(
    session: &mut PtySession,
    deadline: Instant,
) -> (io::Result<ExitStatus>, bool) {
    match timeout_at(deadline, session.wait()).await {
        Ok(status) => (status, false),
        Err(_) => {
            debug!("deadline expired, killing process group");
            session.kill_group();
            (session.wait().await, true)
        }
    }
}

async fn finish_prompt(
    task: Option<PromptTask>,
) -> Option<(PromptOutcome, Box<dyn Write + Send>)> {
    match task?.await {
        Ok(done) => Some(done),
        Err(e) => {
            debug!(error = %e, "prompt task failed");
            None
        }
    }
}

/// Let the capture tasks reach end-of-stream, but not past the later of the
/// deadline and a short grace period.
async fn drain(readers: [JoinHandle<()>; 2], deadline: Instant) {
    let limit = deadline.max(Instant::now() + CAPTURE_GRACE);
    for mut reader in readers {
        if timeout_at(limit, &mut reader).await.is_err() {
            debug!("output still open after child exit, abandoning reader");
            reader.abort();
        }
    }
}

/// Join the terminal reader if it already hit end-of-file. A grandchild
/// that inherited the terminal keeps it blocked in `read`, and that thread
/// is left to finish on hang-up.
fn release_terminal_reader(reader: Option<thread::JoinHandle<()>>) {
    let Some(reader) = reader else { return };
    if reader.is_finished() {
        if reader.join().is_err() {
            debug!("terminal reader panicked");
        }
    } else {
        debug!("terminal still open elsewhere, detaching reader");
    }
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    prompt: Option<PromptOutcome>,
    elapsed: Duration,
}

/// Fold the wait status and deadline state into the final record.
///
/// A process failure sets the error text; an expired deadline forces failure
/// and replaces it. The exit code always comes from the final status.
fn reconcile(
    status: io::Result<ExitStatus>,
    expired: bool,
    timeout: Duration,
    captured: Captured,
) -> ExecutionResult {
    let (mut success, mut error, exit_code) = match status {
        Ok(status) if status.success() => (true, String::new(), 0),
        Ok(status) => (
            false,
            status.to_string(),
            status.code().unwrap_or(NO_EXIT_CODE),
        ),
        Err(e) => (false, e.to_string(), NO_EXIT_CODE),
    };
    if expired {
        success = false;
        error = format!("deadline exceeded after {timeout:?}");
    }

    let (prompt, stdin_written) = match captured.prompt {
        Some(outcome) => (Some(outcome.prompt), outcome.written),
        None => (None, false),
    };

    ExecutionResult {
        stdout: captured.stdout,
        stderr: captured.stderr,
        exit_code,
        success,
        error,
        prompt,
        stdin_written,
        timed_out: expired,
        elapsed: captured.elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn captured() -> Captured {
        Captured {
            stdout: b"out".to_vec(),
            stderr: Vec::new(),
            prompt: None,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_reconcile_success() {
        let result = reconcile(
            Ok(ExitStatus::from_raw(0)),
            false,
            Duration::from_secs(1),
            captured(),
        );
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.error.is_empty());
        assert_eq!(result.stdout, b"out");
    }

    #[test]
    fn test_reconcile_nonzero_exit() {
        // Raw wait status: exit code in the high byte.
        let result = reconcile(
            Ok(ExitStatus::from_raw(3 << 8)),
            false,
            Duration::from_secs(1),
            captured(),
        );
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert!(result.error.contains('3'), "got: {}", result.error);
        assert!(!result.timed_out);
    }

    #[test]
    fn test_reconcile_deadline_overrides_process_error() {
        let killed = ExitStatus::from_raw(libc::SIGKILL);
        let result = reconcile(Ok(killed), true, Duration::from_millis(100), captured());
        assert!(!result.success);
        assert!(result.timed_out);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(result.error.starts_with("deadline exceeded"), "got: {}", result.error);
    }

    #[test]
    fn test_reconcile_deadline_after_clean_exit() {
        let result = reconcile(
            Ok(ExitStatus::from_raw(0)),
            true,
            Duration::from_millis(100),
            captured(),
        );
        assert!(!result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.error.contains("deadline"));
    }

    #[test]
    fn test_reconcile_wait_error() {
        let result = reconcile(
            Err(io::Error::other("wait failed")),
            false,
            Duration::from_secs(1),
            captured(),
        );
        assert!(!result.success);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert_eq!(result.error, "wait failed");
    }

    #[test]
    fn test_release_terminal_reader_joins_finished_thread() {
        let reader = thread::spawn(|| {});
        while !reader.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        release_terminal_reader(Some(reader));
        release_terminal_reader(None);
    }

    #[test]
    fn test_release_terminal_reader_detaches_blocked_thread() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let reader = thread::spawn(move || {
            let _ = rx.recv();
        });
        release_terminal_reader(Some(reader));
        drop(tx);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::AwaitingPrompt.to_string(), "awaiting-prompt");
        assert_eq!(Phase::Idle.to_string(), "idle");
    }
}
