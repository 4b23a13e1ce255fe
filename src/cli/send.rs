//! `prompt send`: write a prompt into the daemon's named pipe.
//!
//! Fire-and-forget: the daemon picks the blob up at its next readiness
//! event and logs the completion outcome. Nothing comes back on this path.

use std::io::Write;

use crate::config;
use crate::daemon::auto_start::is_daemon_running;
use crate::error::{PromptdError, Result};

pub async fn send(text: String) -> Result<()> {
    if text.trim().is_empty() {
        return Err(PromptdError::InvalidArgument("prompt must not be empty".into()));
    }

    let pipe_path = config::pipe_path()?;
    if !pipe_path.exists() || !is_daemon_running().await {
        return Err(PromptdError::DaemonConnection(
            "Daemon is not running. Start it with 'prompt daemon start'.".into(),
        ));
    }

    // The daemon always holds the read end open, so this open doesn't block.
    let path = pipe_path.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut pipe = std::fs::OpenOptions::new().write(true).open(&path)?;
        pipe.write_all(text.as_bytes())?;
        Ok(())
    })
    .await
    .map_err(|e| PromptdError::Pipe(format!("pipe write task failed: {}", e)))??;

    println!("Prompt written to {}", pipe_path.display());
    println!("Outcome will appear in the daemon log ('prompt daemon logs').");
    Ok(())
}
