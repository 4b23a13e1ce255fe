//! Daemonization and PID-file bookkeeping.
//!
//! `daemonize` performs the classic double-fork: the parent returns to the
//! shell immediately, the intermediate child exits so the survivor can
//! never reacquire a controlling terminal, and the survivor becomes a
//! session leader with its stdio redirected onto the configured log files.
//!
//! This must run before the tokio runtime is created: forking a process
//! that already has runtime worker threads leaves the child with dead
//! threads. The daemon binary therefore daemonizes first and only then
//! builds its runtime.

use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{PromptdError, Result};

/// Where the detached process sends its stdio and which directory it runs in.
#[derive(Debug, Clone, Default)]
pub struct DaemonizeOptions {
    /// File receiving the daemon's stdout, opened in append mode. Required.
    pub stdout_log: Option<PathBuf>,
    /// File receiving the daemon's stderr, opened in append mode. Required.
    pub stderr_log: Option<PathBuf>,
    /// Working directory after detaching. Defaults to `/`.
    pub work_dir: Option<PathBuf>,
}

impl DaemonizeOptions {
    /// Options pointing at the standard log locations under the promptd root.
    pub fn from_config_paths() -> Result<Self> {
        Ok(Self {
            stdout_log: Some(config::stdout_log_path()?),
            stderr_log: Some(config::stderr_log_path()?),
            work_dir: Some(config::home_dir()?),
        })
    }
}

/// Detach the current process from its controlling terminal.
///
/// Returns only in the final detached process. Both log paths must be set
/// before any fork happens; a missing path fails fast with no partially
/// detached state. Failure to create a new session is fatal.
pub fn daemonize(opts: &DaemonizeOptions) -> Result<()> {
    // Validate everything up front: no fork until the options are sound.
    let stdout_log = opts
        .stdout_log
        .as_deref()
        .ok_or_else(|| PromptdError::Lifecycle("stdout log path not configured".into()))?;
    let stderr_log = opts
        .stderr_log
        .as_deref()
        .ok_or_else(|| PromptdError::Lifecycle("stderr log path not configured".into()))?;
    let work_dir = opts.work_dir.as_deref().unwrap_or(Path::new("/"));

    for log in [stdout_log, stderr_log] {
        if let Some(parent) = log.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // First fork: the parent returns control to the shell.
    match fork()? {
        ForkResult::Parent => {
            // Safety: plain process exit, nothing to unwind in the parent.
            unsafe { libc::_exit(0) }
        }
        ForkResult::Child => {}
    }

    // Become a session leader, losing the controlling terminal.
    if unsafe { libc::setsid() } < 0 {
        return Err(PromptdError::Lifecycle(format!(
            "setsid failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    // Second fork: the session leader exits, so the survivor can never
    // reacquire a controlling terminal by opening a tty.
    match fork()? {
        ForkResult::Parent => unsafe { libc::_exit(0) },
        ForkResult::Child => {}
    }

    std::env::set_current_dir(work_dir).map_err(|e| {
        PromptdError::Lifecycle(format!("chdir to {} failed: {}", work_dir.display(), e))
    })?;

    redirect_stdio(stdout_log, stderr_log)?;
    Ok(())
}

enum ForkResult {
    Parent,
    Child,
}

fn fork() -> Result<ForkResult> {
    // Safety: the process is single-threaded at this point (no runtime yet).
    match unsafe { libc::fork() } {
        -1 => Err(PromptdError::Lifecycle(format!(
            "fork failed: {}",
            std::io::Error::last_os_error()
        ))),
        0 => Ok(ForkResult::Child),
        _ => Ok(ForkResult::Parent),
    }
}

/// Point fd 0 at /dev/null and fds 1/2 at the log files.
fn redirect_stdio(stdout_log: &Path, stderr_log: &Path) -> Result<()> {
    use std::os::fd::AsRawFd;

    let devnull = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")?;
    let out = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(stdout_log)?;
    let err = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(stderr_log)?;

    for (fd, target) in [(devnull.as_raw_fd(), 0), (out.as_raw_fd(), 1), (err.as_raw_fd(), 2)] {
        // Safety: both fds are valid; dup2 atomically closes the target.
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(PromptdError::Lifecycle(format!(
                "dup2 onto fd {} failed: {}",
                target,
                std::io::Error::last_os_error()
            )));
        }
    }

    // The File handles close their original descriptors on drop; fds 0-2
    // stay pointed at the new targets.
    Ok(())
}

/// Write the current PID to the PID file.
pub fn write_pid_file() -> Result<()> {
    let path = config::pid_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, std::process::id().to_string())?;
    Ok(())
}

/// Read the daemon PID from the PID file, if present and parseable.
///
/// Does not verify that the process is still alive; use a socket ping for a
/// liveness check.
pub fn read_pid() -> Option<u32> {
    let path = config::pid_path().ok()?;
    let pid_str = std::fs::read_to_string(&path).ok()?;
    pid_str.trim().parse().ok()
}

/// Remove the PID file. Errors are ignored; the file may already be gone.
pub fn remove_pid_file() {
    if let Ok(path) = config::pid_path() {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemonize_requires_stdout_log_before_forking() {
        let opts = DaemonizeOptions {
            stdout_log: None,
            stderr_log: Some(PathBuf::from("/tmp/err.log")),
            work_dir: None,
        };

        // Must fail fast: if a fork had happened, this test process would
        // have exited instead of observing the error.
        let err = daemonize(&opts).unwrap_err();
        assert!(matches!(err, PromptdError::Lifecycle(_)));
        assert!(err.to_string().contains("stdout log path"));
    }

    #[test]
    fn daemonize_requires_stderr_log_before_forking() {
        let opts = DaemonizeOptions {
            stdout_log: Some(PathBuf::from("/tmp/out.log")),
            stderr_log: None,
            work_dir: None,
        };

        let err = daemonize(&opts).unwrap_err();
        assert!(err.to_string().contains("stderr log path"));
    }

    #[test]
    fn default_options_have_no_log_paths() {
        let opts = DaemonizeOptions::default();
        assert!(opts.stdout_log.is_none());
        assert!(opts.stderr_log.is_none());
    }
}
