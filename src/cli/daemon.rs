//! CLI commands for managing the promptd daemon process.

use crate::cli::args::DaemonCommand;
use crate::config;
use crate::daemon::DaemonClient;
use crate::daemon::auto_start::{daemon_pid, ensure_daemon, is_daemon_running};
use crate::error::Result;

pub async fn daemon(command: DaemonCommand) -> Result<()> {
    match command {
        DaemonCommand::Status => daemon_status().await,
        DaemonCommand::Start => daemon_start().await,
        DaemonCommand::Stop => daemon_stop().await,
        DaemonCommand::Restart => daemon_restart().await,
        DaemonCommand::Logs { lines } => daemon_logs(lines),
    }
}

async fn daemon_status() -> Result<()> {
    if is_daemon_running().await {
        let mut client = DaemonClient::connect().await?;
        let status = client.status().await?;

        println!("Daemon status: running");
        println!("  PID: {}", status.pid);
        println!("  Version: {}", status.version);
        println!("  Pipe: {}", status.pipe_path);
        println!("  Socket: {}", status.socket_path);
        println!("  Provider: {}", status.provider);
    } else {
        println!("Daemon status: not running");
        println!("  Run 'prompt daemon start' or any ask command to start it.");
    }

    Ok(())
}

async fn daemon_start() -> Result<()> {
    if is_daemon_running().await {
        println!("Daemon is already running.");
        return Ok(());
    }

    match ensure_daemon().await {
        Ok(mut client) => {
            let version = client.ping().await.unwrap_or_default();
            println!("Daemon started successfully.");
            println!("  Version: {}", version);
            if let Some(pid) = daemon_pid() {
                println!("  PID: {}", pid);
            }
            Ok(())
        }
        Err(e) => {
            println!("Failed to start daemon: {}", e);
            let log_path = config::stdout_log_path()?;
            println!("Check logs at: {}", log_path.display());
            Err(e)
        }
    }
}

async fn daemon_stop() -> Result<()> {
    if !is_daemon_running().await {
        println!("Daemon is not running.");
        return Ok(());
    }

    let mut client = DaemonClient::connect().await?;
    client.shutdown().await?;

    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if !is_daemon_running().await {
            println!("Daemon stopped.");
            return Ok(());
        }
    }

    println!("Warning: Daemon may still be shutting down.");
    Ok(())
}

async fn daemon_restart() -> Result<()> {
    if is_daemon_running().await {
        println!("Stopping daemon...");
        daemon_stop().await?;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }
    println!("Starting daemon...");
    daemon_start().await
}

fn daemon_logs(lines: usize) -> Result<()> {
    let log_path = config::stdout_log_path()?;

    if !log_path.exists() {
        println!("No daemon logs found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    println!("{}", read_log_tail(&log_path, lines)?);
    Ok(())
}

/// Read the last N lines from a log file.
fn read_log_tail(path: &std::path::Path, lines: usize) -> Result<String> {
    use std::io::{BufRead, BufReader};

    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let all_lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;

    let start = all_lines.len().saturating_sub(lines);
    Ok(all_lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_log_tail_returns_last_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(file, "line {}", i).unwrap();
        }

        let tail = read_log_tail(file.path(), 3).unwrap();
        assert_eq!(tail, "line 8\nline 9\nline 10");
    }

    #[test]
    fn read_log_tail_handles_short_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only line").unwrap();

        let tail = read_log_tail(file.path(), 50).unwrap();
        assert_eq!(tail, "only line");
    }
}
