//! Command-line interface definitions for rpcgate.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Macro to check CLI configuration and exit early if the check flag is set.
///
/// Prints a success message and returns `Ok(ExitCode::SUCCESS)` when
/// `--check` was passed.
///
/// # Example
///
/// ```ignore
/// use rpcgate_cli::{check_config, Cli};
/// use clap::Parser;
///
/// fn main() -> eyre::Result<std::process::ExitCode> {
///     let cli = Cli::parse();
///     // ... load and validate config ...
///     check_config!(cli);
///     // ... run the command ...
/// }
/// ```
#[macro_export]
macro_rules! check_config {
    ($cli:expr) => {
        if $cli.check {
            println!("Configuration is valid");
            return Ok(::std::process::ExitCode::SUCCESS);
        }
    };
}

/// Command-line interface for the rpcgate gateway.
#[derive(Parser, Debug, Clone)]
#[command(name = "rpcgate")]
#[command(about = "Legacy package-index RPC gateway")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file; built-in defaults are used without one
    #[arg(short, long, env = "RPCGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long, env = "RPCGATE_LOG")]
    pub log_level: Option<String>,

    /// Validate config and exit
    #[arg(long)]
    pub check: bool,

    /// What to do; lists the routes when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every endpoint alias and the methods it serves
    Routes,
    /// Dispatch a single call and print its result or fault
    Call(CallArgs),
}

/// Arguments of the `call` subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CallArgs {
    /// Endpoint alias the call arrives on
    #[arg(short, long, default_value = "RPC2")]
    pub endpoint: String,

    /// Method name
    #[arg(short, long)]
    pub method: String,

    /// Positional arguments as a JSON array
    #[arg(short, long, default_value = "[]")]
    pub params: String,

    /// Keyword arguments as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub kwargs: String,

    /// Caller identity used for rate limiting
    #[arg(long, default_value = "127.0.0.1")]
    pub caller: String,

    /// HTTP verb of the simulated request
    #[arg(long, default_value = "POST")]
    pub verb: String,

    /// JSON package index to serve from
    #[arg(short, long, env = "RPCGATE_DATA")]
    pub data: Option<PathBuf>,
}
