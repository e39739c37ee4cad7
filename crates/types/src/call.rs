//! Per-call request, context and response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP verb every legacy endpoint accepts.
const POST: &str = "POST";

/// Raw call arguments as decoded by the wire layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Positional arguments in call order.
    #[serde(default)]
    pub positional: Vec<Value>,
    /// Keyword arguments by name.
    #[serde(default)]
    pub keyword: Map<String, Value>,
}

impl Params {
    /// Empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments made of positional values only.
    #[must_use]
    pub fn positional(values: Vec<Value>) -> Self {
        Self { positional: values, keyword: Map::new() }
    }

    /// Add a keyword argument.
    #[must_use]
    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keyword.insert(name.into(), value);
        self
    }

    /// Total number of arguments.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    /// Whether no argument was passed.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::positional(values)
    }
}

/// A decoded call as handed over by the wire layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Endpoint alias the call arrived on.
    pub endpoint: String,
    /// HTTP verb of the transport request.
    pub verb: String,
    /// Caller identity, normally the remote address.
    pub caller: String,
    /// Method name.
    pub method: String,
    /// Call arguments.
    pub params: Params,
}

impl Request {
    /// A POST call from an unspecified local caller.
    pub fn post(endpoint: impl Into<String>, method: impl Into<String>, params: Params) -> Self {
        Self {
            endpoint: endpoint.into(),
            verb: POST.to_string(),
            caller: "127.0.0.1".to_string(),
            method: method.into(),
            params,
        }
    }

    /// Set the caller identity.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Set the HTTP verb.
    #[must_use]
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    /// Whether the verb is one the endpoints accept.
    pub fn is_post(&self) -> bool {
        self.verb.eq_ignore_ascii_case(POST)
    }

    /// Split into the per-call context handed to the pipeline.
    pub fn into_context(self) -> CallContext {
        CallContext {
            caller: self.caller,
            endpoint: self.endpoint,
            method: self.method,
            params: self.params,
        }
    }
}

/// Per-call state owned by a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    /// Caller identity used for rate limiting.
    pub caller: String,
    /// Endpoint alias the call arrived on.
    pub endpoint: String,
    /// Method name.
    pub method: String,
    /// Raw arguments.
    pub params: Params,
}

/// Cache metadata for a cacheable result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheTag {
    /// Tag used to group and purge cached results.
    pub tag: String,
    /// How long the result may be served from cache.
    pub ttl: Duration,
}

impl CacheTag {
    /// Create a new cache tag.
    pub fn new(tag: impl Into<String>, ttl: Duration) -> Self {
        Self { tag: tag.into(), ttl }
    }
}

/// Successful call outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Sanitized result value.
    pub value: Value,
    /// Cache metadata, for cacheable methods.
    pub cache: Option<CacheTag>,
}
