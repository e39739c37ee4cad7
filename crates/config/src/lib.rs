#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/rpcgate/rpcgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
pub use config::GatewayConfig;

mod sections;
pub use sections::{
    CacheConfig, GatewaySettings, LogFormat, LoggingConfig, MetricsConfig, RateLimitConfig,
    DEFAULT_CACHE_CAPACITY, DEFAULT_DOMAIN, DEFAULT_FILES_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_METRICS_HOST, DEFAULT_METRICS_PORT, DEFAULT_METRICS_PREFIX, DEFAULT_RATE_LIMIT_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS,
};
