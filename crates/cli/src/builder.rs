//! Application builder for wiring the gateway from configuration.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::{Context, Result};
use rpcgate_cache::{MemoryCache, ResponseCache};
use rpcgate_config::GatewayConfig;
use rpcgate_index::{Links, MemoryIndex, PackageIndex};
use rpcgate_rpc::{
    Gateway, GatewayBuilder, NoopMetrics, RateLimiterConfig, SlidingWindowRateLimiter,
    StatsdMetrics, Unlimited,
};
use rpcgate_traits::{Metrics, RateLimiter};
use rpcgate_types::{Fault, Request, Value};

/// Builder for constructing the rpcgate application.
///
/// # Example
///
/// ```ignore
/// use rpcgate_cli::AppBuilder;
/// use rpcgate_config::GatewayConfig;
///
/// let config = GatewayConfig::from_file("rpcgate.toml".as_ref())?;
/// let app = AppBuilder::new().with_data("index.json").build(&config)?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    data: Option<PathBuf>,
    metrics: Option<Arc<dyn Metrics>>,
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder")
            .field("data", &self.data)
            .field("metrics", &self.metrics.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl AppBuilder {
    /// Create a new application builder serving an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: None, metrics: None }
    }

    /// Serve the JSON package index stored at `path`.
    #[must_use]
    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data = Some(path.into());
        self
    }

    /// Record metrics into `metrics` instead of the configured sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the application from configuration.
    ///
    /// 1. Creates the metrics sink
    /// 2. Creates the rate limiter if enabled
    /// 3. Loads the package index
    /// 4. Creates the response cache if enabled
    /// 5. Registers the legacy methods
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the metrics sink
    /// cannot be created, the index cannot be loaded or registration fails.
    pub fn build(self, config: &GatewayConfig) -> Result<App> {
        config.validate()?;

        // 1. Create the metrics sink
        let metrics: Arc<dyn Metrics> = match self.metrics {
            Some(metrics) => metrics,
            None if config.metrics.enabled => {
                let sink = StatsdMetrics::new(
                    &config.metrics.host,
                    config.metrics.port,
                    &config.metrics.prefix,
                )
                .wrap_err("failed to create statsd sink")?;
                debug!(host = %config.metrics.host, port = config.metrics.port, "Created statsd sink");
                Arc::new(sink)
            }
            None => Arc::new(NoopMetrics),
        };

        // 2. Create the rate limiter if enabled
        let limiter: Arc<dyn RateLimiter> = if config.rate_limit.enabled {
            let limits =
                RateLimiterConfig::new(config.rate_limit.requests, config.rate_limit_window());
            debug!(requests = config.rate_limit.requests, "Created sliding window rate limiter");
            Arc::new(SlidingWindowRateLimiter::new(limits))
        } else {
            Arc::new(Unlimited)
        };

        // 3. Load the package index
        let index = match &self.data {
            Some(path) => load_index(path)?,
            None => MemoryIndex::default(),
        };
        debug!(projects = index.len(), "Loaded package index");
        let index: Arc<dyn PackageIndex> = Arc::new(index);

        // 4. Create the response cache if enabled
        let cache = config.cache.enabled.then(|| {
            debug!(capacity = config.cache.capacity, "Created response cache");
            Arc::new(ResponseCache::new(MemoryCache::new(config.cache.capacity)))
        });

        // 5. Register the legacy methods
        let links = Links::new(&config.gateway.domain, &config.gateway.files_url);
        let mut builder = GatewayBuilder::new(limiter, metrics);
        if let Some(cache) = &cache {
            builder = builder.with_response_store(cache.clone());
        }
        rpcgate_index::register(&mut builder, index, links)
            .wrap_err("failed to register legacy methods")?;
        let gateway = builder.build();

        Ok(App { gateway, cache })
    }
}

fn load_index(path: &Path) -> Result<MemoryIndex> {
    MemoryIndex::from_file(path)
        .wrap_err_with(|| format!("failed to load package index from {}", path.display()))
}

/// A wired gateway whose cacheable methods share an optional response cache.
#[derive(Debug)]
pub struct App {
    gateway: Gateway,
    cache: Option<Arc<ResponseCache<MemoryCache>>>,
}

impl App {
    /// The gateway.
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// The response cache, when enabled.
    pub fn cache(&self) -> Option<&ResponseCache<MemoryCache>> {
        self.cache.as_deref()
    }

    /// Every endpoint alias with the methods it serves, sorted.
    pub fn routes(&self) -> Vec<(&str, Vec<&str>)> {
        self.gateway
            .endpoints()
            .map(|endpoint| (endpoint, self.gateway.methods(endpoint)))
            .collect()
    }

    /// Answer `request`.
    ///
    /// Cacheable methods are served from the response cache once the call has
    /// been counted, admitted by the rate limiter and validated.
    pub async fn call(&self, request: Request) -> Result<Value, Fault> {
        self.gateway.dispatch(request).await.map(|response| response.value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rpcgate_rpc::{
        metrics::{CALL, RATELIMITER_EXCEEDED},
        RecordingMetrics,
    };
    use rpcgate_types::Params;
    use serde_json::json;

    use super::*;

    const INDEX: &str = r#"{
        "projects": [
            {"name": "Flask", "last_serial": 5, "releases": [{"version": "3.0", "ordering": 1}]},
            {"name": "requests", "last_serial": 9, "releases": [{"version": "2.31.0", "ordering": 1}]}
        ]
    }"#;

    fn index_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INDEX.as_bytes()).unwrap();
        file
    }

    fn list_packages() -> Request {
        Request::post("RPC2", "list_packages", Params::new())
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let app = AppBuilder::new().build(&GatewayConfig::default()).unwrap();
        let routes = app.routes();
        let endpoints: Vec<_> = routes.iter().map(|(endpoint, _)| *endpoint).collect();
        assert_eq!(endpoints, vec!["RPC2", "pypi", "pypi_slash"]);
        assert!(routes.iter().all(|(_, methods)| methods.len() == 17));
        assert!(app.cache().is_some());

        assert_eq!(app.call(list_packages()).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_build_with_data() {
        let file = index_file();
        let app = AppBuilder::new().with_data(file.path()).build(&GatewayConfig::default()).unwrap();
        assert_eq!(app.call(list_packages()).await.unwrap(), json!(["Flask", "requests"]));
    }

    #[test]
    fn test_build_missing_data() {
        let err = AppBuilder::new()
            .with_data("/nonexistent/index.json")
            .build(&GatewayConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to load package index"));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.gateway.domain = String::new();
        assert!(AppBuilder::new().build(&config).is_err());
    }

    #[tokio::test]
    async fn test_cached_responses_are_counted() {
        let file = index_file();
        let metrics = Arc::new(RecordingMetrics::new());
        let app = AppBuilder::new()
            .with_data(file.path())
            .with_metrics(metrics.clone())
            .build(&GatewayConfig::default())
            .unwrap();

        let first = app.call(list_packages()).await.unwrap();
        let second = app.call(list_packages()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(metrics.count(CALL), 2);
        assert_eq!(app.cache().unwrap().inner().tagged("all-projects"), 1);
    }

    #[tokio::test]
    async fn test_cached_responses_are_rate_limited() {
        let mut config = GatewayConfig::default();
        config.rate_limit.requests = 1;
        let metrics = Arc::new(RecordingMetrics::new());
        let app = AppBuilder::new().with_metrics(metrics.clone()).build(&config).unwrap();

        let mut admitted = 0;
        for _ in 0..5 {
            if app.call(list_packages().with_caller("203.0.113.9")).await.is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(metrics.count(CALL), 5);
        assert_eq!(metrics.count(RATELIMITER_EXCEEDED), 4);
    }

    #[tokio::test]
    async fn test_uncached_methods_always_dispatch() {
        let metrics = Arc::new(RecordingMetrics::new());
        let app = AppBuilder::new()
            .with_metrics(metrics.clone())
            .build(&GatewayConfig::default())
            .unwrap();
        let request = Request::post("pypi", "changelog_last_serial", Params::new());

        assert_eq!(app.call(request.clone()).await.unwrap(), Value::Null);
        assert_eq!(app.call(request).await.unwrap(), Value::Null);
        assert_eq!(metrics.count(CALL), 2);
        assert!(app.cache().unwrap().inner().is_empty());
    }

    #[tokio::test]
    async fn test_faults_pass_through_the_cache() {
        let app = AppBuilder::new().build(&GatewayConfig::default()).unwrap();

        let unknown = app.call(Request::post("RPC2", "nope", Params::new())).await.unwrap_err();
        assert_eq!(unknown.code(), -32601);

        let get = list_packages().with_verb("GET");
        assert!(app.call(get).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let mut config = GatewayConfig::default();
        config.cache.enabled = false;
        let app = AppBuilder::new().build(&config).unwrap();
        assert!(app.cache().is_none());
        assert_eq!(app.call(list_packages()).await.unwrap(), json!([]));
    }
}
