//! Endpoint multiplexer.
//!
//! [`GatewayBuilder`] composes one [`Pipeline`] per registered method and binds
//! that same pipeline into the routing table of every alias the method lists.
//! Routing conflicts are reported at registration, so a built [`Gateway`]
//! never has to resolve ambiguity per call.

use std::{collections::BTreeMap, sync::Arc};

use derive_more::{Display, Error};
use rpcgate_traits::{Metrics, RateLimiter, ResponseStore};
use rpcgate_types::{Fault, Request, Response};

use crate::{
    method::MethodSpec,
    metrics::NoopMetrics,
    pipeline::Pipeline,
    rate_limiter::{Throttle, Unlimited},
};

type Routes = BTreeMap<String, BTreeMap<String, Arc<Pipeline>>>;

/// Error raised while registering methods.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistrationError {
    /// The endpoint already routes a method of this name.
    #[display("method {method} is already registered on endpoint {endpoint}")]
    Duplicate {
        /// Endpoint alias.
        endpoint: String,
        /// Method name.
        method: String,
    },
    /// The method lists no endpoint, so nothing could ever call it.
    #[display("method {_0} has no endpoint aliases")]
    NoAliases(#[error(not(source))] String),
}

/// Builder for a [`Gateway`].
pub struct GatewayBuilder {
    limiter: Arc<dyn RateLimiter>,
    metrics: Arc<dyn Metrics>,
    store: Option<Arc<dyn ResponseStore>>,
    routes: Routes,
}

impl GatewayBuilder {
    /// Create a builder whose pipelines share `limiter` and `metrics`.
    pub fn new(limiter: Arc<dyn RateLimiter>, metrics: Arc<dyn Metrics>) -> Self {
        Self { limiter, metrics, store: None, routes: BTreeMap::new() }
    }

    /// Serve cacheable methods registered from now on through `store`.
    #[must_use]
    pub fn with_response_store(mut self, store: Arc<dyn ResponseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register `spec` on every one of its aliases.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the routing table untouched, if the spec has
    /// no alias or one of its aliases already routes a method of that name.
    pub fn register(&mut self, spec: MethodSpec) -> Result<&mut Self, RegistrationError> {
        if spec.endpoint_aliases().is_empty() {
            return Err(RegistrationError::NoAliases(spec.name().to_string()));
        }

        for endpoint in spec.endpoint_aliases() {
            let taken = self.routes.get(endpoint).is_some_and(|methods| methods.contains_key(spec.name()));
            if taken {
                return Err(RegistrationError::Duplicate {
                    endpoint: endpoint.clone(),
                    method: spec.name().to_string(),
                });
            }
        }

        let throttle = Throttle::new(Arc::clone(&self.limiter), Arc::clone(&self.metrics));
        let mut pipeline = Pipeline::new(&spec, throttle, Arc::clone(&self.metrics));
        if let Some(store) = &self.store {
            pipeline = pipeline.with_store(Arc::clone(store));
        }
        let pipeline = Arc::new(pipeline);
        for endpoint in spec.endpoint_aliases() {
            self.routes
                .entry(endpoint.clone())
                .or_default()
                .insert(spec.name().to_string(), Arc::clone(&pipeline));
        }
        debug!(method = spec.name(), aliases = ?spec.endpoint_aliases(), "registered method");
        Ok(self)
    }

    /// Register every spec in `specs`, stopping at the first error.
    ///
    /// # Errors
    ///
    /// See [`GatewayBuilder::register`].
    pub fn register_all(
        &mut self,
        specs: impl IntoIterator<Item = MethodSpec>,
    ) -> Result<&mut Self, RegistrationError> {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(self)
    }

    /// Freeze the routing table.
    pub fn build(self) -> Gateway {
        Gateway { routes: Arc::new(self.routes) }
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new(Arc::new(Unlimited), Arc::new(NoopMetrics))
    }
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder").field("endpoints", &self.routes.len()).finish_non_exhaustive()
    }
}

/// Immutable routing table from endpoint alias and method name to pipeline.
#[derive(Clone)]
pub struct Gateway {
    routes: Arc<Routes>,
}

impl Gateway {
    /// Endpoint aliases, sorted.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Methods routed by `endpoint`, sorted.
    pub fn methods(&self, endpoint: &str) -> Vec<&str> {
        self.routes
            .get(endpoint)
            .map(|methods| methods.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Pipeline bound to `method` on `endpoint`.
    pub fn route(&self, endpoint: &str, method: &str) -> Option<&Arc<Pipeline>> {
        self.routes.get(endpoint)?.get(method)
    }

    /// Dispatch one decoded call.
    ///
    /// Only POST is served; any other verb yields the generic application
    /// error. Unknown endpoints and methods yield the method-not-found fault.
    pub async fn dispatch(&self, request: Request) -> Result<Response, Fault> {
        if !request.is_post() {
            debug!(verb = %request.verb, endpoint = %request.endpoint, "unsupported verb");
            return Err(Fault::Application);
        }

        let Some(pipeline) = self.route(&request.endpoint, &request.method) else {
            debug!(endpoint = %request.endpoint, method = %request.method, "no such method");
            return Err(Fault::MethodNotFound(request.method));
        };

        let pipeline = Arc::clone(pipeline);
        pipeline.run(&request.into_context()).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.routes.iter().map(|(endpoint, methods)| (endpoint, methods.keys().collect::<Vec<_>>())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use rpcgate_types::{FaultCategory, Params, Value};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{
        handler_fn,
        metrics::{RecordingMetrics, CALL, RATELIMITER_EXCEEDED, TIMING},
        CachePolicy, ParamType, ParameterSchema, RateLimiterConfig, SlidingWindowRateLimiter,
    };

    const ALIASES: [&str; 3] = ["RPC2", "pypi", "pypi_slash"];

    fn counting_spec(name: &str, calls: Arc<AtomicUsize>) -> MethodSpec {
        MethodSpec::new(
            name,
            handler_fn(move |_, args| {
                calls.fetch_add(1, Ordering::SeqCst);
                let name = args.str("name")?;
                let count = args.int("count")?;
                Ok(json!({ "name": name, "count": count, "note": "line\u{b}break" }))
            }),
        )
        .aliases(ALIASES)
        .schema(ParameterSchema::new().required("name", ParamType::Str).required("count", ParamType::Int))
        .cache(CachePolicy::by_project())
    }

    fn gateway(calls: Arc<AtomicUsize>) -> (Gateway, Arc<RecordingMetrics>) {
        let metrics = Arc::new(RecordingMetrics::new());
        let mut builder = GatewayBuilder::new(Arc::new(Unlimited), metrics.clone());
        builder.register(counting_spec("lookup", calls)).unwrap();
        (builder.build(), metrics)
    }

    fn call(endpoint: &str, params: Vec<Value>) -> Request {
        Request::post(endpoint, "lookup", Params::positional(params))
    }

    #[tokio::test]
    async fn test_aliases_share_one_pipeline() {
        let (gateway, _) = gateway(Arc::new(AtomicUsize::new(0)));
        let first = gateway.route("RPC2", "lookup").unwrap();
        for alias in ALIASES {
            assert!(Arc::ptr_eq(first, gateway.route(alias, "lookup").unwrap()));
        }
        assert_eq!(gateway.endpoints().collect::<Vec<_>>(), vec!["RPC2", "pypi", "pypi_slash"]);
        assert_eq!(gateway.methods("pypi"), vec!["lookup"]);
        assert!(gateway.methods("nope").is_empty());
    }

    #[rstest]
    #[case(vec![json!("Foo-Bar"), json!(2)])]
    #[case(vec![json!("Foo-Bar"), json!("2")])]
    #[case(vec![json!(7)])]
    #[tokio::test]
    async fn test_aliases_answer_identically(#[case] params: Vec<Value>) {
        let (gateway, _) = gateway(Arc::new(AtomicUsize::new(0)));
        let a = gateway.dispatch(call("RPC2", params.clone())).await;
        let b = gateway.dispatch(call("pypi", params.clone())).await;
        let c = gateway.dispatch(call("pypi_slash", params)).await;
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[tokio::test]
    async fn test_success_carries_clean_value_and_tag() {
        let (gateway, metrics) = gateway(Arc::new(AtomicUsize::new(0)));
        let response = gateway.dispatch(call("pypi", vec![json!("Foo_Bar"), json!(3)])).await.unwrap();
        assert_eq!(response.value, json!({"name": "Foo_Bar", "count": 3, "note": "linebreak"}));
        let tag = response.cache.unwrap();
        assert_eq!(tag.tag, "project/foo-bar");
        assert_eq!(tag.ttl, Duration::from_secs(48 * 3600));
        assert_eq!(metrics.count_tagged(CALL, "rpc_method:lookup"), 1);
    }

    #[tokio::test]
    async fn test_wrong_type_enumerates_violations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (gateway, _) = gateway(calls.clone());
        let fault = gateway.dispatch(call("RPC2", vec![json!(1), json!("5")])).await.unwrap_err();
        assert_eq!(fault.code(), -32602);
        assert_eq!(
            fault.message(),
            "client error; name: input should be a valid string; count: input should be a valid integer"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_routes_and_verbs() {
        let (gateway, metrics) = gateway(Arc::new(AtomicUsize::new(0)));

        let fault = gateway.dispatch(call("XMLRPC", vec![])).await.unwrap_err();
        assert_eq!(fault.category(), FaultCategory::MethodNotFound);

        let fault = gateway
            .dispatch(Request::post("RPC2", "missing", Params::new()))
            .await
            .unwrap_err();
        assert_eq!(fault.code(), -32601);

        let fault = gateway.dispatch(call("RPC2", vec![]).with_verb("GET")).await.unwrap_err();
        assert_eq!(fault, Fault::Application);
        assert_eq!(fault.message(), "application error");

        // Nothing reached a pipeline.
        assert_eq!(metrics.count(CALL), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_across_aliases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let metrics = Arc::new(RecordingMetrics::new());
        let limiter = Arc::new(SlidingWindowRateLimiter::new(RateLimiterConfig::new(
            2,
            Duration::from_secs(60),
        )));
        let mut builder = GatewayBuilder::new(limiter.clone(), metrics.clone());
        builder.register(counting_spec("lookup", calls.clone())).unwrap();
        let gateway = builder.build();

        let ok = vec![json!("foo"), json!(1)];
        gateway.dispatch(call("RPC2", ok.clone()).with_caller("10.1.1.1")).await.unwrap();
        gateway.dispatch(call("pypi", ok.clone()).with_caller("10.1.1.1")).await.unwrap();
        for _ in 0..3 {
            let fault = gateway
                .dispatch(call("pypi_slash", ok.clone()).with_caller("10.1.1.1"))
                .await
                .unwrap_err();
            assert!(fault.message().starts_with("HTTPTooManyRequests: "));
        }

        assert_eq!(limiter.hits("10.1.1.1"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.count(CALL), 5);
        assert_eq!(metrics.timings(TIMING), 5);
        assert_eq!(metrics.count(RATELIMITER_EXCEEDED), 3);

        // Another caller still gets through.
        gateway.dispatch(call("RPC2", ok).with_caller("10.2.2.2")).await.unwrap();
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = GatewayBuilder::default();
        builder.register(counting_spec("lookup", Arc::default())).unwrap();

        let clash = MethodSpec::new("lookup", handler_fn(|_, _| Ok(Value::Null))).aliases(["new", "pypi"]);
        let err = builder.register(clash).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Duplicate { endpoint: "pypi".into(), method: "lookup".into() }
        );
        assert_eq!(err.to_string(), "method lookup is already registered on endpoint pypi");

        // The failed registration bound nothing.
        let gateway = builder.build();
        assert!(gateway.route("new", "lookup").is_none());
    }

    #[test]
    fn test_registration_without_aliases_rejected() {
        let mut builder = GatewayBuilder::default();
        let err = builder
            .register(MethodSpec::new("orphan", handler_fn(|_, _| Ok(Value::Null))))
            .unwrap_err();
        assert_eq!(err, RegistrationError::NoAliases("orphan".into()));
    }

    #[test]
    fn test_register_all() {
        let mut builder = GatewayBuilder::default();
        builder
            .register_all([
                MethodSpec::new("a", handler_fn(|_, _| Ok(Value::Null))).alias("RPC2"),
                MethodSpec::new("b", handler_fn(|_, _| Ok(Value::Null))).alias("RPC2"),
            ])
            .unwrap();
        assert_eq!(builder.build().methods("RPC2"), vec!["a", "b"]);
    }
}
