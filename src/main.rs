use clap::Parser;
use std::process::ExitCode;

use promptd::cli::args::{Cli, Commands};
use promptd::cli::{ask, daemon, send};
use promptd::error::exit_codes;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> promptd::Result<()> {
    match cli.command {
        Commands::Daemon { action } => daemon::daemon(action).await,

        Commands::Ask {
            text,
            tries,
            max_tokens,
            temperature,
        } => ask::ask(text, tries, max_tokens, temperature).await,

        Commands::Send { text } => send::send(text).await,
    }
}
