//! Tracing subscriber setup.

use eyre::{eyre, Context, Result};
use rpcgate_config::{GatewayConfig, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the event filter for `level`, e.g. `info` or `rpcgate_rpc=debug,info`.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive.
pub fn log_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the level is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = log_filter(&config.level)?;
    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    installed.map_err(|e| eyre!("failed to install tracing subscriber: {e}"))
}

/// Log the effective configuration at startup.
pub fn log_config_summary(config: &GatewayConfig) {
    info!(
        domain = %config.gateway.domain,
        files_url = %config.gateway.files_url,
        "gateway settings"
    );
    if config.rate_limit.enabled {
        info!(
            requests = config.rate_limit.requests,
            window_secs = config.rate_limit.window_secs,
            "rate limiting enabled"
        );
    } else {
        info!("rate limiting disabled");
    }
    if config.metrics.enabled {
        info!(
            host = %config.metrics.host,
            port = config.metrics.port,
            prefix = %config.metrics.prefix,
            "statsd metrics enabled"
        );
    }
    if config.cache.enabled {
        info!(capacity = config.cache.capacity, "response cache enabled");
    }
}
