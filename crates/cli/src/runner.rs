//! Command execution.

use std::{fmt::Write as _, process::ExitCode};

use eyre::{Context, Result};
use rpcgate_config::GatewayConfig;
use rpcgate_types::{Map, Params, Request, Value};

use crate::{
    builder::{App, AppBuilder},
    cli::{CallArgs, Cli, Command},
};

/// Load the configuration named by `cli`, or the defaults without one, and
/// apply the command-line overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the result is
/// invalid.
pub fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}

/// Run `command` against `config`, printing its output.
///
/// A call that faults prints the fault and exits with a failure code.
///
/// # Errors
///
/// Returns an error if the application cannot be built or the call
/// arguments do not decode.
pub async fn run_command(command: Command, config: &GatewayConfig) -> Result<ExitCode> {
    match command {
        Command::Routes => {
            let app = AppBuilder::new().build(config)?;
            print!("{}", render_routes(&app));
            Ok(ExitCode::SUCCESS)
        }
        Command::Call(args) => {
            let mut builder = AppBuilder::new();
            if let Some(path) = &args.data {
                builder = builder.with_data(path);
            }
            let app = builder.build(config)?;
            let (output, ok) = call(&app, &args).await?;
            println!("{output}");
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// One line per endpoint: the alias followed by its methods.
pub fn render_routes(app: &App) -> String {
    let mut out = String::new();
    for (endpoint, methods) in app.routes() {
        let _ = writeln!(out, "{endpoint}: {}", methods.join(", "));
    }
    out
}

/// Dispatch the call described by `args`. Returns the pretty-printed result
/// or fault, and whether the call succeeded.
///
/// # Errors
///
/// Returns an error if `--params` or `--kwargs` is not the expected JSON.
pub async fn call(app: &App, args: &CallArgs) -> Result<(String, bool)> {
    let request = request(args)?;
    let (value, ok) = match app.call(request).await {
        Ok(value) => (value, true),
        Err(fault) => {
            debug!(code = fault.code(), method = %args.method, "call faulted");
            (serde_json::to_value(fault.to_body())?, false)
        }
    };
    Ok((serde_json::to_string_pretty(&value)?, ok))
}

fn request(args: &CallArgs) -> Result<Request> {
    let positional: Vec<Value> = serde_json::from_str(&args.params)
        .wrap_err_with(|| format!("--params must be a JSON array, got {}", args.params))?;
    let keyword: Map<String, Value> = serde_json::from_str(&args.kwargs)
        .wrap_err_with(|| format!("--kwargs must be a JSON object, got {}", args.kwargs))?;
    Ok(Request::post(&args.endpoint, &args.method, Params { positional, keyword })
        .with_caller(&args.caller)
        .with_verb(&args.verb))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use serde_json::json;

    use super::*;

    fn call_args(method: &str, params: &str) -> CallArgs {
        let cli = Cli::parse_from(["rpcgate", "call", "--method", method, "--params", params]);
        match cli.command {
            Some(Command::Call(args)) => args,
            _ => panic!("expected call"),
        }
    }

    fn app() -> App {
        AppBuilder::new().build(&GatewayConfig::default()).unwrap()
    }

    #[test]
    fn test_load_config_defaults() {
        let cli = Cli::parse_from(["rpcgate"]);
        assert_eq!(load_config(&cli).unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_load_config_file_and_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gateway]\ndomain = \"test.pypi.org\"\n\n[logging]\nlevel = \"warn\"").unwrap();
        let path = file.path().to_str().unwrap();

        let config = load_config(&Cli::parse_from(["rpcgate", "--config", path])).unwrap();
        assert_eq!(config.gateway.domain, "test.pypi.org");
        assert_eq!(config.logging.level, "warn");

        let cli = Cli::parse_from(["rpcgate", "--config", path, "--log-level", "trace"]);
        assert_eq!(load_config(&cli).unwrap().logging.level, "trace");
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = Cli::parse_from(["rpcgate", "--config", "/nonexistent/rpcgate.toml"]);
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[test]
    fn test_render_routes() {
        let routes = render_routes(&app());
        let lines: Vec<_> = routes.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("RPC2: browse, changelog, "));
        assert!(lines[1].starts_with("pypi: "));
        assert!(lines[2].starts_with("pypi_slash: "));
    }

    #[tokio::test]
    async fn test_call_success() {
        let (output, ok) = call(&app(), &call_args("package_hosting_mode", r#"["foo"]"#)).await.unwrap();
        assert!(ok);
        assert_eq!(output, "\"pypi-only\"");
    }

    #[tokio::test]
    async fn test_call_fault() {
        let (output, ok) = call(&app(), &call_args("package_hosting_mode", "[]")).await.unwrap();
        assert!(!ok);
        let body: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(body["faultCode"], json!(-32602));
    }

    #[tokio::test]
    async fn test_call_rejects_bad_params() {
        let err = call(&app(), &call_args("list_packages", "{}")).await.unwrap_err();
        assert!(err.to_string().contains("--params must be a JSON array"));
    }
}
