//! Auto-start: make sure the daemon is running before a CLI command needs it.

use std::process::Command;
use std::time::Duration;
use tokio::time::sleep;

use crate::config;
use crate::daemon::client::DaemonClient;
use crate::daemon::lifecycle;
use crate::error::{PromptdError, Result};

/// Ensure the daemon is running, starting it if necessary.
///
/// Tries to connect first; if that fails, spawns `promptd` and retries the
/// connection with a linear backoff.
pub async fn ensure_daemon() -> Result<DaemonClient> {
    if let Ok(client) = DaemonClient::connect().await {
        return Ok(client);
    }

    spawn_daemon()?;

    // Backoff: 50ms, 100ms, 150ms, ...
    for attempt in 0..10 {
        let delay = Duration::from_millis(50 * (attempt + 1));
        sleep(delay).await;

        if let Ok(client) = DaemonClient::connect().await {
            return Ok(client);
        }
    }

    let log_path = config::stdout_log_path()?;
    Err(PromptdError::DaemonConnection(format!(
        "Failed to start daemon. Check {} for details.",
        log_path.display()
    )))
}

/// Spawn the daemon process. The `promptd` binary is expected next to the
/// `prompt` binary; it daemonizes itself, so no stream plumbing is needed
/// beyond nulling stdio.
fn spawn_daemon() -> Result<()> {
    use std::process::Stdio;

    let current_exe = std::env::current_exe()?;
    let daemon_path = current_exe.with_file_name("promptd");

    if !daemon_path.exists() {
        return Err(PromptdError::DaemonConnection(format!(
            "Daemon binary not found at {:?}",
            daemon_path
        )));
    }

    let daemon_dir = config::daemon_dir()?;
    std::fs::create_dir_all(&daemon_dir)?;

    Command::new(&daemon_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(())
}

/// Check if the daemon is currently reachable over its socket.
pub async fn is_daemon_running() -> bool {
    DaemonClient::connect().await.is_ok()
}

/// Get the daemon PID from its PID file, if any.
pub fn daemon_pid() -> Option<u32> {
    lifecycle::read_pid()
}
