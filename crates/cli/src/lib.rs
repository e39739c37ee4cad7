#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/rpcgate/rpcgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod builder;
pub use builder::{App, AppBuilder};

mod cli;
pub use cli::{CallArgs, Cli, Command};
// Note: check_config! macro is automatically exported via #[macro_export]

mod logging;
pub use logging::{init_tracing, log_config_summary, log_filter};

mod runner;
pub use runner::{call, load_config, render_routes, run_command};

// Re-export for convenience
pub use clap;
pub use eyre;
