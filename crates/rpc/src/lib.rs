#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/rpcgate/rpcgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod cache_policy;
pub use cache_policy::{
    canonicalize_name, CachePolicy, TagSource, ALL_PROJECTS_TAG, ALL_PROJECTS_TTL, PROJECT_TAG,
    PROJECT_TTL,
};

mod method;
pub use method::{handler_fn, FnHandler, Handler, MethodSpec};

pub mod metrics;
pub use metrics::{MetricEvent, NoopMetrics, RecordingMetrics, StatsdMetrics};

mod pipeline;
pub use pipeline::Pipeline;

mod rate_limiter;
pub use rate_limiter::{RateLimiterConfig, SlidingWindowRateLimiter, Throttle, Unlimited};

mod router;
pub use router::{Gateway, GatewayBuilder, RegistrationError};

mod sanitize;
pub use sanitize::{clean, clean_opt, clean_value};

mod schema;
pub use schema::{Param, ParamType, ParameterSchema};

mod validator;
pub use validator::{validate, BoundArgs, Violation};
