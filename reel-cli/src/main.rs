//! Reel CLI - Command-line interface
//!
//! Starts the playback server or inspects a recordings directory.

mod commands;

use clap::Parser;
use reel_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Serve stored recordings with seekable playback")]
struct Cli {
    /// Console log level; the full trace always goes to logs/
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_file = init_tracing(cli.log_level.as_tracing_level(), None)?;
    tracing::info!("Reel starting, debug log at {}", log_file.display());

    commands::handle_command(cli.command).await
}
