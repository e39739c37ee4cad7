//! Methods that are no longer served.
//!
//! They keep their names so old clients get an explanation instead of a
//! method-not-found fault. None of them reads the index.

use rpcgate_rpc::{handler_fn, MethodSpec, ParameterSchema};
use rpcgate_types::{ErrorKind, Fault};

/// Where deprecated methods point their callers.
pub const DEPRECATION_URL: &str =
    "https://warehouse.pypa.io/api-reference/xml-rpc.html#deprecated-methods";

/// A method that always fails with `fault`, whatever it is called with.
fn refused(name: &str, fault: Fault) -> MethodSpec {
    MethodSpec::new(name, handler_fn(move |_, _| Err(fault.clone()))).schema(ParameterSchema::unchecked())
}

pub(crate) fn search(domain: &str) -> MethodSpec {
    refused(
        "search",
        Fault::runtime(format!(
            "PyPI no longer supports 'pip search' (or XML-RPC search). Please use \
             https://{domain}/search (via a browser) instead. See {DEPRECATION_URL} for more \
             information."
        )),
    )
}

pub(crate) fn top_packages() -> MethodSpec {
    refused(
        "top_packages",
        Fault::runtime(format!(
            "This API has been removed. Use BigQuery instead. See {DEPRECATION_URL} for more \
             information."
        )),
    )
}

pub(crate) fn package_data() -> MethodSpec {
    refused("package_data", deprecated_api())
}

pub(crate) fn package_urls() -> MethodSpec {
    refused("package_urls", deprecated_api())
}

pub(crate) fn multicall() -> MethodSpec {
    refused(
        "system.multicall",
        Fault::wrapped(
            ErrorKind::Value,
            "MultiCall requests have been deprecated, use individual requests instead.",
        ),
    )
}

fn deprecated_api() -> Fault {
    Fault::runtime(format!(
        "This API has been deprecated. See {DEPRECATION_URL} for more information."
    ))
}

#[cfg(test)]
mod tests {
    use rpcgate_types::{CallContext, Params, Request};
    use serde_json::json;

    use super::*;

    fn ctx(method: &str) -> CallContext {
        Request::post("RPC2", method, Params::positional(vec![json!("anything"), json!(1)]))
            .into_context()
    }

    #[tokio::test]
    async fn test_search_mentions_domain() {
        let spec = search("test.pypi.org");
        let fault = spec.handler().call(&ctx("search"), Default::default()).await.unwrap_err();
        assert_eq!(
            fault.message(),
            format!(
                "RuntimeError: PyPI no longer supports 'pip search' (or XML-RPC search). Please \
                 use https://test.pypi.org/search (via a browser) instead. See {DEPRECATION_URL} \
                 for more information."
            )
        );
        assert!(spec.parameter_schema().is_unchecked());
    }

    #[tokio::test]
    async fn test_refusals_are_stable() {
        for spec in [top_packages(), package_data(), package_urls(), multicall()] {
            let first = spec.handler().call(&ctx(spec.name()), Default::default()).await;
            let second = spec.handler().call(&ctx(spec.name()), Default::default()).await;
            assert_eq!(first, second);
            assert_eq!(first.unwrap_err().code(), -32500);
        }
    }

    #[tokio::test]
    async fn test_multicall_is_value_error() {
        let fault = multicall().handler().call(&ctx("system.multicall"), Default::default()).await;
        assert_eq!(
            fault.unwrap_err().message(),
            "ValueError: MultiCall requests have been deprecated, use individual requests instead."
        );
    }
}
