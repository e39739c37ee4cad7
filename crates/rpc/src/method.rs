//! Method handlers and their registration metadata.

use std::{collections::BTreeSet, fmt, sync::Arc};

use async_trait::async_trait;
use rpcgate_types::{CallContext, Fault, Value};

use crate::{cache_policy::CachePolicy, schema::ParameterSchema, validator::BoundArgs};

/// Business logic of one method.
///
/// Handlers only ever see arguments that passed validation against the
/// schema they were registered with.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Produce the raw result of the call.
    async fn call(&self, ctx: &CallContext, args: BoundArgs) -> Result<Value, Fault>;
}

/// [`Handler`] wrapping a synchronous closure.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&CallContext, BoundArgs) -> Result<Value, Fault> + Send + Sync + 'static,
{
    async fn call(&self, ctx: &CallContext, args: BoundArgs) -> Result<Value, Fault> {
        (self.f)(ctx, args)
    }
}

/// Wrap a closure as a [`Handler`].
pub const fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&CallContext, BoundArgs) -> Result<Value, Fault> + Send + Sync + 'static,
{
    FnHandler { f }
}

/// A method ready to be registered: name, endpoints, schema, cache policy and
/// handler.
#[derive(Clone)]
pub struct MethodSpec {
    name: String,
    aliases: BTreeSet<String>,
    schema: ParameterSchema,
    cache: Option<CachePolicy>,
    handler: Arc<dyn Handler>,
}

impl MethodSpec {
    /// A method without endpoints, parameters or cache policy.
    pub fn new(name: impl Into<String>, handler: impl Handler) -> Self {
        Self::from_arc(name, Arc::new(handler))
    }

    /// Same as [`MethodSpec::new`] for an already shared handler.
    pub fn from_arc(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            aliases: BTreeSet::new(),
            schema: ParameterSchema::new(),
            cache: None,
            handler,
        }
    }

    /// Expose the method on one more endpoint alias.
    #[must_use]
    pub fn alias(mut self, endpoint: impl Into<String>) -> Self {
        self.aliases.insert(endpoint.into());
        self
    }

    /// Expose the method on every alias in `endpoints`.
    #[must_use]
    pub fn aliases<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(endpoints.into_iter().map(Into::into));
        self
    }

    /// Set the parameter schema.
    #[must_use]
    pub fn schema(mut self, schema: ParameterSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Mark results cacheable under `policy`.
    #[must_use]
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint aliases, sorted and deduplicated.
    pub const fn endpoint_aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Parameter schema.
    pub const fn parameter_schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Cache policy, for cacheable methods.
    pub const fn cache_policy(&self) -> Option<&CachePolicy> {
        self.cache.as_ref()
    }

    /// The handler.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("schema", &self.schema)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
