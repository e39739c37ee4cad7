#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/rpcgate/rpcgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod deprecated;
pub use deprecated::DEPRECATION_URL;

mod handlers;

mod legacy;
pub use legacy::{legacy_methods, register, ENDPOINTS};

mod links;
pub use links::Links;

mod memory;
pub use memory::MemoryIndex;

mod model;
pub use model::{File, IndexData, JournalEntry, Project, ProjectUrl, Release, Role};

mod store;
pub use store::{IndexError, PackageIndex, CHANGELOG_LIMIT};
