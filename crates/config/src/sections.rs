//! Configuration sections and their defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default public domain of the index.
pub const DEFAULT_DOMAIN: &str = "pypi.org";
/// Default download URL template; `{path}` is replaced by the file path.
pub const DEFAULT_FILES_URL: &str = "https://files.pythonhosted.org/packages/{path}";
/// Default calls admitted per client and window.
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 3600;
/// Default rate limit window, in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;
/// Default `StatsD` host.
pub const DEFAULT_METRICS_HOST: &str = "127.0.0.1";
/// Default `StatsD` port.
pub const DEFAULT_METRICS_PORT: u16 = 8125;
/// Default metric name prefix.
pub const DEFAULT_METRICS_PREFIX: &str = "warehouse";
/// Default number of cached responses.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `[gateway]`: how links in results are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Public domain, used in project and release links.
    pub domain: String,
    /// Download URL template containing `{path}`.
    pub files_url: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self { domain: DEFAULT_DOMAIN.to_string(), files_url: DEFAULT_FILES_URL.to_string() }
    }
}

/// `[rate_limit]`: per-client quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether callers are limited at all.
    pub enabled: bool,
    /// Calls admitted per client within one window.
    pub requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

/// `[metrics]`: `StatsD` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics are sent.
    pub enabled: bool,
    /// Agent host.
    pub host: String,
    /// Agent UDP port.
    pub port: u16,
    /// Prefix of every metric name.
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: DEFAULT_METRICS_HOST.to_string(),
            port: DEFAULT_METRICS_PORT,
            prefix: DEFAULT_METRICS_PREFIX.to_string(),
        }
    }
}

/// `[cache]`: response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cacheable responses are stored.
    pub enabled: bool,
    /// Maximum number of stored responses.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: DEFAULT_CACHE_CAPACITY }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// `[logging]`: tracing subscriber setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `rpcgate_rpc=debug,info`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), format: LogFormat::default() }
    }
}
