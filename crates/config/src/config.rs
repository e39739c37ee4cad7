//! Root configuration.

use std::{path::Path, time::Duration};

use eyre::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::sections::{CacheConfig, GatewaySettings, LoggingConfig, MetricsConfig, RateLimitConfig};

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Link building.
    pub gateway: GatewaySettings,
    /// Per-client quota.
    pub rate_limit: RateLimitConfig,
    /// `StatsD` export.
    pub metrics: MetricsConfig,
    /// Response cache.
    pub cache: CacheConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a field has the
    /// wrong type.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).wrap_err("failed to parse configuration")
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    /// Serialize back to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).wrap_err("failed to serialize configuration")
    }

    /// Check values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.domain.trim().is_empty() {
            bail!("gateway.domain must not be empty");
        }
        if !self.gateway.files_url.contains("{path}") {
            bail!("gateway.files_url must contain a {{path}} placeholder");
        }
        if self.rate_limit.enabled {
            if self.rate_limit.requests == 0 {
                bail!("rate_limit.requests must be greater than zero");
            }
            if self.rate_limit.window_secs == 0 {
                bail!("rate_limit.window_secs must be greater than zero");
            }
        }
        if self.metrics.enabled && self.metrics.host.trim().is_empty() {
            bail!("metrics.host must not be empty when metrics are enabled");
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            bail!("cache.capacity must be greater than zero when the cache is enabled");
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }

    /// Rate limit window as a [`Duration`].
    pub const fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }
}
