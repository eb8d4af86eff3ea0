use std::io::{ErrorKind, Read};
use std::thread;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Spawns a background thread to read from a PTY
///
/// Chunks are forwarded to `tx` until the receiver goes away; after that the
/// terminal is still drained so the child never blocks writing to it.
pub fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    tx: UnboundedSender<Vec<u8>>,
    verbose: bool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = [0u8; 4096];
        let mut forwarding = true;
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    if forwarding && tx.send(buffer[..n].to_vec()).is_err() {
                        forwarding = false;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // Linux reports a hung-up terminal as EIO.
                Err(e) if e.raw_os_error() == Some(libc::EIO) => break,
                Err(e) => {
                    if verbose {
                        warn!(error = %e, "terminal read failed");
                    }
                    break;
                }
            }
        }
        debug!("terminal reader finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    #[test]
    fn test_forwards_until_eof() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_reader(Cursor::new(b"Password: ".to_vec()), tx, false)
            .join()
            .unwrap();
        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.extend(chunk);
        }
        assert_eq!(received, b"Password: ");
    }

    #[test]
    fn test_keeps_draining_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let data = vec![b'x'; 3 * 4096];
        // Finishing at all means the whole input was consumed.
        spawn_reader(Cursor::new(data), tx, false).join().unwrap();
    }
}
