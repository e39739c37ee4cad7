#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

/// Argument and result values as decoded by the wire layer.
pub use serde_json::{Map, Value};

mod call;
pub use call::{CacheTag, CallContext, Params, Request, Response};

mod error;
pub use error::{error_codes, ErrorKind, Fault, FaultBody, FaultCategory, WrappedError};
