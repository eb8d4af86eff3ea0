use crate::error::{ConfigError, Result, RunError};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::{Pid, setsid};
use portable_pty::{MasterPty, PtySize};
use std::ffi::{CStr, OsStr};
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

/// A program whose stdin and controlling terminal are a PTY, with stdout and
/// stderr on separate pipes.
pub struct PtySession {
    master: Box<dyn MasterPty + Send>,
    child: Child,
    pid: Option<u32>,
}

impl PtySession {
    /// Spawn `argv` in a new session attached to a fresh PTY, returning the
    /// session and the child's output pipes separately.
    pub fn spawn(argv: &[String]) -> Result<(Self, ChildStdout, ChildStderr)> {
        let pty_system = portable_pty::native_pty_system();

        // Create PTY with reasonable defaults
        let pty_size = PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(pty_size)
            .map_err(|e| RunError::OpenPty(e.into()))?;

        // Open our own handle on the slave so it can be wired to stdin only.
        let master_fd = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| RunError::OpenPty("pseudo-terminal master has no descriptor".into()))?;
        let tty = slave_path(master_fd).map_err(|e| RunError::OpenPty(Box::new(e)))?;
        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&tty)
            .map_err(|e| RunError::OpenPty(Box::new(e)))?;
        drop(pair.slave);

        let (program, args) = argv.split_first().ok_or(ConfigError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::from(slave))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // SAFETY: the hook only issues async-signal-safe syscalls.
        unsafe {
            cmd.pre_exec(attach_controlling_terminal);
        }

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;
        // The command still owns the parent's copy of the slave; closing it
        // lets the master see end-of-stream once the child is gone.
        drop(cmd);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
        let pid = child.id();
        debug!(pid, tty = %tty.display(), "spawned child");

        let session = PtySession {
            master: pair.master,
            child,
            pid,
        };

        Ok((session, stdout, stderr))
    }

    /// A new handle reading whatever the child writes to its terminal.
    pub fn reader(&self) -> Result<Box<dyn Read + Send>> {
        self.master
            .try_clone_reader()
            .map_err(|e| RunError::Io(io::Error::other(e)))
    }

    /// The terminal's input side.
    ///
    /// Dropping the writer sends end-of-file to the terminal, so callers keep
    /// it alive until the child has been reaped.
    pub fn take_writer(&self) -> Result<Box<dyn Write + Send>> {
        self.master
            .take_writer()
            .map_err(|e| RunError::Io(io::Error::other(e)))
    }

    /// Kill the child's whole process group.
    pub fn kill_group(&mut self) {
        if let Some(pid) = self.pid {
            match i32::try_from(pid) {
                Ok(pgid) => match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                    Ok(()) => return,
                    Err(e) => debug!(pid, error = %e, "killpg failed, killing child only"),
                },
                Err(_) => debug!(pid, "pid out of range for killpg, killing child only"),
            }
        }
        let _ = self.child.start_kill();
    }

    /// Wait for the child process to exit
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Runs in the forked child: become a session leader and adopt the slave on
/// fd 0 as the controlling terminal.
fn attach_controlling_terminal() -> io::Result<()> {
    setsid()?;
    // SAFETY: plain ioctl on fd 0, which is the PTY slave at this point.
    if unsafe { libc::ioctl(0, libc::TIOCSCTTY as _, 0) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Device path of the slave side of the PTY whose master is `fd`.
#[cfg(target_os = "linux")]
fn slave_path(fd: RawFd) -> io::Result<PathBuf> {
    let mut buf = [0 as libc::c_char; 128];
    // SAFETY: the buffer is valid for `buf.len()` bytes and ptsname_r
    // NUL-terminates on success.
    let rc = unsafe { libc::ptsname_r(fd, buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    // SAFETY: see above.
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(PathBuf::from(OsStr::from_bytes(name.to_bytes())))
}

#[cfg(not(target_os = "linux"))]
fn slave_path(fd: RawFd) -> io::Result<PathBuf> {
    // SAFETY: the returned pointer is copied out before anything else can
    // call ptsname.
    let ptr = unsafe { libc::ptsname(fd) };
    if ptr.is_null() {
        return Err(io::Error::last_os_error());
    }
    let name = unsafe { CStr::from_ptr(ptr) };
    Ok(PathBuf::from(OsStr::from_bytes(name.to_bytes())))
}
