use clap::{Parser, Subcommand};

/// prompt - talk to the local promptd completion daemon
#[derive(Parser)]
#[command(name = "prompt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the promptd daemon process
    Daemon {
        #[command(subcommand)]
        action: DaemonCommand,
    },

    /// Send a prompt over the daemon socket and print the answer
    Ask {
        /// The prompt text
        text: String,

        /// Retry budget override
        #[arg(long)]
        tries: Option<u32>,

        /// Token limit override
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Temperature override
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Write a prompt into the daemon's named pipe (fire-and-forget;
    /// the outcome lands in the daemon log)
    Send {
        /// The prompt text
        text: String,
    },
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Show daemon status
    Status,
    /// Start the daemon
    Start,
    /// Stop the daemon
    Stop,
    /// Restart the daemon
    Restart,
    /// Show daemon logs
    Logs {
        /// Number of lines to show
        #[arg(long, default_value = "50")]
        lines: usize,
    },
}
