//! Playback CLI - Command-line interface
//!
//! Runs the streaming server or inspects how a request would be served.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use playback_core::tracing_setup::{CliLogLevel, LogSettings, init_tracing};

#[derive(Parser)]
#[command(name = "playback")]
#[command(about = "Range-aware video streaming server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory for the full-trace log of this run
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut log_settings = LogSettings::from_env(cli.log_level.as_tracing_level());
    if let Some(logs_dir) = cli.logs_dir {
        log_settings = log_settings.with_logs_dir(logs_dir);
    }
    init_tracing(&log_settings)?;

    commands::handle_command(cli.command).await?;

    Ok(())
}
