//! The single-shot prompt exchange.
//!
//! Output is accumulated until the stream pauses, the pause is taken to mean
//! the program now waits for input, and the rule is evaluated exactly once
//! against everything gathered so far. On a match the payload and a newline
//! are written to the terminal. Later prompts are never answered.

use crate::rule::PromptMatcher;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Why accumulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// No new output within the settle window.
    Pause,
    /// Every output source closed.
    EndOfStream,
    /// The run's deadline passed first.
    Deadline,
}

/// What the exchange observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOutcome {
    pub prompt: Vec<u8>,
    pub boundary: Boundary,
    pub matched: bool,
    pub written: bool,
}

pub(crate) struct PromptExchange {
    matcher: PromptMatcher,
    payload: String,
    settle: Duration,
    deadline: Instant,
}

impl PromptExchange {
    pub(crate) fn new(
        matcher: PromptMatcher,
        payload: impl Into<String>,
        settle: Duration,
        deadline: Instant,
    ) -> Self {
        Self {
            matcher,
            payload: payload.into(),
            settle,
            deadline,
        }
    }

    /// Run the exchange, handing the writer back so the caller controls when
    /// the terminal sees end-of-file.
    pub(crate) async fn run<W: Write>(
        self,
        mut rx: UnboundedReceiver<Vec<u8>>,
        mut writer: W,
    ) -> (PromptOutcome, W) {
        let (prompt, boundary) = accumulate(&mut rx, self.settle, self.deadline).await;
        // Nothing reads from the stream after the single pass.
        drop(rx);

        let text = String::from_utf8_lossy(&prompt);
        let matched = boundary != Boundary::Deadline && self.matcher.matches(&text);
        debug!(bytes = prompt.len(), ?boundary, matched, "prompt boundary reached");

        let written = matched && self.inject(&mut writer);
        let outcome = PromptOutcome {
            prompt,
            boundary,
            matched,
            written,
        };
        (outcome, writer)
    }

    fn inject<W: Write>(&self, writer: &mut W) -> bool {
        let mut line = Vec::with_capacity(self.payload.len() + 1);
        line.extend_from_slice(self.payload.as_bytes());
        line.push(b'\n');
        match writer.write_all(&line).and_then(|()| writer.flush()) {
            Ok(()) => {
                debug!(bytes = line.len(), "stdin written");
                true
            }
            Err(e) => {
                debug!(error = %e, "failed to write stdin");
                false
            }
        }
    }
}

/// Gather output until a pause, end-of-stream or the deadline.
///
/// The first chunk may take until the deadline to arrive; after that each
/// chunk must follow the previous one within `settle`.
pub(crate) async fn accumulate(
    rx: &mut UnboundedReceiver<Vec<u8>>,
    settle: Duration,
    deadline: Instant,
) -> (Vec<u8>, Boundary) {
    let mut buffer = Vec::new();
    loop {
        let until = if buffer.is_empty() {
            deadline
        } else {
            (Instant::now() + settle).min(deadline)
        };
        match timeout_at(until, rx.recv()).await {
            Ok(Some(chunk)) => buffer.extend_from_slice(&chunk),
            Ok(None) => return (buffer, Boundary::EndOfStream),
            Err(_) if Instant::now() >= deadline => return (buffer, Boundary::Deadline),
            Err(_) => return (buffer, Boundary::Pause),
        }
    }
}
