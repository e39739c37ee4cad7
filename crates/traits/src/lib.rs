#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cache;
pub use cache::{Cache, CacheError, ResponseStore};

mod metrics;
pub use metrics::{Metrics, Timer};

mod rate_limiter;
pub use rate_limiter::RateLimiter;
