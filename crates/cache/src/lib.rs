#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/rpcgate/rpcgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod memory;
pub use memory::{MemoryCache, DEFAULT_CAPACITY};

mod response;
pub use response::{cache_key, ResponseCache};
