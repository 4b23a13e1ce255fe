//! promptd daemon - multiplexes the prompt pipe and the IPC socket.
//!
//! The promptd binary is a long-running background process that:
//! - Reads raw prompt blobs from a named pipe and completes them,
//!   logging the outcome
//! - Accepts IPC connections from the CLI over a Unix domain socket
//! - Handles graceful shutdown on SIGTERM/SIGINT or a Shutdown request
//!
//! ## Usage
//!
//! The daemon is typically started automatically by the CLI when needed.
//! Manual start: `promptd` (detaches) or `promptd --foreground`.
//!
//! ## Files
//!
//! - `~/.promptd/daemon/promptd.pipe_in` - Named pipe for raw prompts
//! - `~/.promptd/daemon/promptd.sock` - Unix socket for IPC
//! - `~/.promptd/daemon/promptd.pid` - PID file for process tracking
//! - `~/.promptd/daemon/promptd.out.log` - Daemon log file
//!
//! Daemonization happens before the tokio runtime is built: forking with
//! live runtime threads would leave the child with a dead scheduler.

use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;

use promptd::completion::provider::build_provider;
use promptd::config;
use promptd::daemon::lifecycle::{self, DaemonizeOptions};
use promptd::daemon::server::DaemonServer;

fn main() -> anyhow::Result<()> {
    let foreground = std::env::args().any(|arg| arg == "--foreground" || arg == "-f");

    let daemon_dir = config::daemon_dir()?;
    std::fs::create_dir_all(&daemon_dir)?;

    let config = config::load()?;

    if !foreground {
        // Double-fork and redirect stdio onto the log files. Only the final
        // detached process returns from this call.
        let opts = DaemonizeOptions::from_config_paths()?;
        lifecycle::daemonize(&opts)?;
    }

    let _guard = init_logging(&daemon_dir, foreground)?;

    tracing::info!("promptd starting, version {}", env!("CARGO_PKG_VERSION"));

    lifecycle::write_pid_file()?;

    let provider = build_provider(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run_server(config, provider));

    lifecycle::remove_pid_file();

    match result {
        Ok(()) => {
            tracing::info!("promptd shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!("promptd exited with error: {}", e);
            Err(e.into())
        }
    }
}

async fn run_server(
    config: config::Config,
    provider: Arc<dyn promptd::completion::CompletionProvider>,
) -> promptd::Result<()> {
    let server = DaemonServer::bind(config, provider)?;
    server.run().await
}

/// Initialize logging for the daemon.
///
/// Foreground runs log to stdout with ANSI colors. Detached runs log through
/// a non-blocking appender into `promptd.out.log`; the file is opened in
/// append mode so restarts extend the existing log. The returned guard must
/// be kept alive so buffered lines are flushed on exit.
fn init_logging(daemon_dir: &std::path::Path, foreground: bool) -> anyhow::Result<Option<WorkerGuard>> {
    if foreground {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
        return Ok(None);
    }

    let file_appender =
        tracing_appender::rolling::never(daemon_dir, format!("{}.out.log", config::DAEMON_NAME));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Ok(Some(guard))
}
