//! Byte-exact capture of the child's stdout and stderr pipes.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::warn;

/// Shared buffer a capture task appends to.
pub type CaptureBuffer = Arc<Mutex<Vec<u8>>>;

/// Copy `stream` into `sink` until end-of-stream.
///
/// When `tee` is set every chunk is also forwarded to the prompt
/// accumulator. The sink always receives the full stream.
pub fn spawn_capture<R>(
    mut stream: R,
    sink: CaptureBuffer,
    tee: Option<UnboundedSender<Vec<u8>>>,
    verbose: bool,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tee = tee;
        let mut buffer = [0u8; 4096];
        loop {
            match stream.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = &buffer[..n];
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(chunk);
                    if tee
                        .as_ref()
                        .is_some_and(|tx| tx.send(chunk.to_vec()).is_err())
                    {
                        tee = None;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if verbose {
                        warn!(error = %e, "output read failed");
                    }
                    break;
                }
            }
        }
    })
}

/// Take the bytes captured so far.
pub fn take(buffer: &CaptureBuffer) -> Vec<u8> {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_capture_without_tee() {
        let sink = CaptureBuffer::default();
        spawn_capture(&b"line one\nline two\n"[..], sink.clone(), None, false)
            .await
            .unwrap();
        assert_eq!(take(&sink), b"line one\nline two\n");
        assert!(take(&sink).is_empty());
    }

    #[tokio::test]
    async fn test_tee_sees_same_bytes() {
        let sink = CaptureBuffer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_capture(&b"Continue? [y/N] "[..], sink.clone(), Some(tx), false)
            .await
            .unwrap();

        let mut teed = Vec::new();
        while let Some(chunk) = rx.recv().await {
            teed.extend(chunk);
        }
        assert_eq!(teed, b"Continue? [y/N] ");
        assert_eq!(take(&sink), b"Continue? [y/N] ");
    }

    #[tokio::test]
    async fn test_closed_tee_does_not_stop_capture() {
        let sink = CaptureBuffer::default();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        spawn_capture(&b"still captured"[..], sink.clone(), Some(tx), false)
            .await
            .unwrap();
        assert_eq!(take(&sink), b"still captured");
    }
}
