//! Cache tag derivation for cacheable methods.

use std::time::Duration;

use rpcgate_types::{CacheTag, Value};

use crate::validator::BoundArgs;

/// TTL of results tied to a single project.
pub const PROJECT_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// TTL of results that list every project.
pub const ALL_PROJECTS_TTL: Duration = Duration::from_secs(60 * 60);

/// Tag template of per-project results.
pub const PROJECT_TAG: &str = "project/%s";

/// Tag of all-project listings.
pub const ALL_PROJECTS_TAG: &str = "all-projects";

/// Where a cache tag comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// The template is the tag.
    Fixed,
    /// `%s` in the template is replaced by the processed argument at this index.
    Argument(usize),
}

/// Cache policy attached to a method.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttl: Duration,
    template: String,
    source: TagSource,
    processor: fn(&str) -> String,
}

impl CachePolicy {
    /// A policy whose tag is always `tag`.
    pub fn fixed(tag: impl Into<String>, ttl: Duration) -> Self {
        Self { ttl, template: tag.into(), source: TagSource::Fixed, processor: canonicalize_name }
    }

    /// A policy deriving its tag from the argument at `index`, canonicalized
    /// with [`canonicalize_name`] unless another processor is set.
    pub fn from_argument(template: impl Into<String>, index: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            template: template.into(),
            source: TagSource::Argument(index),
            processor: canonicalize_name,
        }
    }

    /// Per-project results: `project/<canonical name of argument 0>`, 48 hours.
    pub fn by_project() -> Self {
        Self::from_argument(PROJECT_TAG, 0, PROJECT_TTL)
    }

    /// All-project listings: `all-projects`, 1 hour.
    pub fn all_projects() -> Self {
        Self::fixed(ALL_PROJECTS_TAG, ALL_PROJECTS_TTL)
    }

    /// Replace the argument processor.
    #[must_use]
    pub fn with_processor(mut self, processor: fn(&str) -> String) -> Self {
        self.processor = processor;
        self
    }

    /// Declared TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tag template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Tag source.
    pub const fn source(&self) -> TagSource {
        self.source
    }

    /// Compute the tag for one call.
    pub fn resolve(&self, args: &BoundArgs) -> CacheTag {
        let tag = match self.source {
            TagSource::Fixed => self.template.clone(),
            TagSource::Argument(index) => {
                let key = match args.nth(index) {
                    Some(Value::String(text)) => (self.processor)(text),
                    Some(other) => (self.processor)(&other.to_string()),
                    None => String::new(),
                };
                self.template.replacen("%s", &key, 1)
            }
        };
        CacheTag::new(tag, self.ttl)
    }
}

/// Canonical form of a package name: lower-cased, with every run of `-`, `_`
/// and `.` collapsed into a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}
