//! rpcgate - legacy package-index RPC gateway
//!
//! This binary provides the command-line entry point to the gateway.

use std::process::ExitCode;

use clap::Parser;
use eyre::Result;
use rpcgate_cli::{check_config, init_tracing, load_config, log_config_summary, run_command, Cli, Command};

/// Main entry point for rpcgate.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.logging)?;
    if let Some(path) = &cli.config {
        tracing::info!(config_path = %path.display(), "Loaded configuration");
    }

    check_config!(cli);

    log_config_summary(&config);

    run_command(cli.command.unwrap_or(Command::Routes), &config).await
}
