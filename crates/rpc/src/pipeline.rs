//! The per-method middleware chain.

use std::sync::Arc;

use rpcgate_traits::{Metrics, ResponseStore};
use rpcgate_types::{CallContext, Fault, Response};

use crate::{
    cache_policy::CachePolicy,
    method::{Handler, MethodSpec},
    metrics::{CALL, METHOD_TAG, TIMING},
    rate_limiter::Throttle,
    sanitize::clean_value,
    schema::ParameterSchema,
    validator::validate,
};

/// Middleware chain composed once per method at registration.
///
/// Stages run in a fixed order: metrics (outermost), rate limiting, argument
/// validation, the response store, then the handler. The first fault ends the
/// call. Handler results are sanitized and annotated with their cache tag.
/// Cacheable methods are answered from the response store when it holds a
/// live result, so cached answers are still counted and rate limited.
pub struct Pipeline {
    method: String,
    schema: ParameterSchema,
    cache: Option<CachePolicy>,
    handler: Arc<dyn Handler>,
    throttle: Throttle,
    metrics: Arc<dyn Metrics>,
    store: Option<Arc<dyn ResponseStore>>,
}

impl Pipeline {
    /// Compose the chain for `spec`.
    pub fn new(spec: &MethodSpec, throttle: Throttle, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            method: spec.name().to_string(),
            schema: spec.parameter_schema().clone(),
            cache: spec.cache_policy().cloned(),
            handler: Arc::clone(spec.handler()),
            throttle,
            metrics,
            store: None,
        }
    }

    /// Answer cacheable calls from `store` and record fresh results into it.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResponseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Name of the wrapped method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Parameter schema enforced before the handler runs.
    pub const fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Cache policy of the wrapped method.
    pub const fn cache_policy(&self) -> Option<&CachePolicy> {
        self.cache.as_ref()
    }

    /// Run one call through the chain.
    pub async fn run(&self, ctx: &CallContext) -> Result<Response, Fault> {
        let tags = [(METHOD_TAG, self.method.as_str())];
        self.metrics.increment(CALL, &tags);
        let _timer = self.metrics.timed(TIMING, &tags);

        self.throttle.admit(&ctx.caller)?;

        let args = validate(&self.schema, &ctx.params).inspect_err(|fault| {
            debug!(method = %self.method, caller = %ctx.caller, %fault, "rejected call arguments");
        })?;

        let cache = self.cache.as_ref().map(|policy| policy.resolve(&args));
        let store = self.store.as_ref().filter(|_| cache.is_some());
        if let Some(store) = store {
            match store.lookup(&self.method, &ctx.params).await {
                Ok(Some(value)) => return Ok(Response { value, cache }),
                Ok(None) => {}
                Err(err) => warn!(method = %self.method, %err, "response cache lookup failed"),
            }
        }

        let value = self.handler.call(ctx, args).await?;
        let response = Response { value: clean_value(value), cache };

        if let Some(store) = store {
            if let Err(err) = store.store(&self.method, &ctx.params, &response).await {
                warn!(method = %self.method, %err, "response cache store failed");
            }
        }
        Ok(response)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("method", &self.method)
            .field("schema", &self.schema)
            .field("cache", &self.cache)
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
