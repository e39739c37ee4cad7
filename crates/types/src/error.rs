//! Protocol faults returned to the wire layer in place of a result.
//!
//! Every stage of the call pipeline reports failure as a [`Fault`]. A fault is
//! terminal for its call: the wire layer encodes it as a `{faultCode,
//! faultString}` response and nothing else runs.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Fault codes used by the gateway.
pub mod error_codes {
    /// The gateway cannot serve any request.
    pub const SERVICE_UNAVAILABLE: i32 = -32403;
    /// Wrapped and generic application errors, including rate limiting.
    pub const APPLICATION_ERROR: i32 = -32500;
    /// No such endpoint or method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Arguments failed validation.
    pub const INVALID_PARAMS: i32 = -32602;
}

/// Coarse classification of a [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    /// Gateway-level failure unrelated to the request.
    ServiceUnavailable,
    /// Client sent arguments that do not match the method's schema.
    InvalidParams,
    /// Anything raised by a handler or by rate limiting.
    ApplicationError,
    /// Unknown endpoint or method.
    MethodNotFound,
}

/// Kind of an application error, rendered as the prefix of the fault string.
///
/// The rendered names are part of the legacy protocol surface and are matched
/// by existing clients, so they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The caller exhausted its request quota.
    #[display("HTTPTooManyRequests")]
    TooManyRequests,
    /// Removed or deprecated functionality.
    #[display("RuntimeError")]
    Runtime,
    /// The request shape is no longer accepted.
    #[display("ValueError")]
    Value,
    /// The data source failed to answer a lookup.
    #[display("LookupError")]
    Lookup,
}

/// An application error carried inside [`Fault::Wrapped`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{kind}: {detail}")]
pub struct WrappedError {
    kind: ErrorKind,
    detail: String,
}

impl WrappedError {
    /// Wrap a detail message under the given kind.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    /// The error kind.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The detail message, without the kind prefix.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// A protocol-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Fault {
    /// The gateway cannot serve requests at all.
    #[display("server error; service unavailable")]
    ServiceUnavailable,
    /// Validation failed; holds the joined violation list.
    #[display("client error; {_0}")]
    InvalidParams(#[error(not(source))] String),
    /// An application error with a stable code and a `<kind>: <detail>` message.
    #[display("{_0}")]
    Wrapped(#[error(not(source))] WrappedError),
    /// Generic application error without detail.
    #[display("application error")]
    Application,
    /// The named method is not routed on the requested endpoint.
    #[display("server error; requested method not found")]
    MethodNotFound(#[error(not(source))] String),
}

impl Fault {
    /// Wrap an application error.
    pub fn wrapped(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Wrapped(WrappedError::new(kind, detail))
    }

    /// Shorthand for a [`ErrorKind::Runtime`] wrapped error.
    pub fn runtime(detail: impl Into<String>) -> Self {
        Self::wrapped(ErrorKind::Runtime, detail)
    }

    /// Shorthand for a [`ErrorKind::Lookup`] wrapped error.
    pub fn lookup(detail: impl Into<String>) -> Self {
        Self::wrapped(ErrorKind::Lookup, detail)
    }

    /// Numeric fault code.
    pub const fn code(&self) -> i32 {
        match self {
            Self::ServiceUnavailable => error_codes::SERVICE_UNAVAILABLE,
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::Wrapped(_) | Self::Application => error_codes::APPLICATION_ERROR,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
        }
    }

    /// Category of this fault.
    pub const fn category(&self) -> FaultCategory {
        match self {
            Self::ServiceUnavailable => FaultCategory::ServiceUnavailable,
            Self::InvalidParams(_) => FaultCategory::InvalidParams,
            Self::Wrapped(_) | Self::Application => FaultCategory::ApplicationError,
            Self::MethodNotFound(_) => FaultCategory::MethodNotFound,
        }
    }

    /// The fault string sent to the client.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The wrapped error, if this is a [`Fault::Wrapped`].
    pub const fn as_wrapped(&self) -> Option<&WrappedError> {
        match self {
            Self::Wrapped(wrapped) => Some(wrapped),
            _ => None,
        }
    }

    /// Serializable body for the wire layer.
    pub fn to_body(&self) -> FaultBody {
        FaultBody { fault_code: self.code(), fault_string: self.message() }
    }
}

/// Encoded form of a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultBody {
    /// Numeric fault code.
    pub fault_code: i32,
    /// Human readable fault string.
    pub fault_string: String,
}

impl From<&Fault> for FaultBody {
    fn from(fault: &Fault) -> Self {
        fault.to_body()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Fault::ServiceUnavailable, -32403, FaultCategory::ServiceUnavailable)]
    #[case(Fault::InvalidParams("x: bad".into()), -32602, FaultCategory::InvalidParams)]
    #[case(Fault::runtime("gone"), -32500, FaultCategory::ApplicationError)]
    #[case(Fault::Application, -32500, FaultCategory::ApplicationError)]
    #[case(Fault::MethodNotFound("nope".into()), -32601, FaultCategory::MethodNotFound)]
    fn test_codes_and_categories(
        #[case] fault: Fault,
        #[case] code: i32,
        #[case] category: FaultCategory,
    ) {
        assert_eq!(fault.code(), code);
        assert_eq!(fault.category(), category);
    }

    #[test]
    fn test_validation_and_application_codes_differ() {
        assert_ne!(error_codes::INVALID_PARAMS, error_codes::APPLICATION_ERROR);
        assert_ne!(error_codes::SERVICE_UNAVAILABLE, error_codes::APPLICATION_ERROR);
    }

    #[test]
    fn test_messages() {
        assert_eq!(Fault::ServiceUnavailable.message(), "server error; service unavailable");
        assert_eq!(
            Fault::InvalidParams("count: input should be a valid integer".into()).message(),
            "client error; count: input should be a valid integer"
        );
        assert_eq!(Fault::runtime("This API has been removed.").message(), "RuntimeError: This API has been removed.");
        assert_eq!(
            Fault::wrapped(ErrorKind::Value, "no multicall").message(),
            "ValueError: no multicall"
        );
        assert_eq!(Fault::Application.message(), "application error");
        assert_eq!(
            Fault::MethodNotFound("missing".into()).message(),
            "server error; requested method not found"
        );
    }

    #[test]
    fn test_wrapped_accessors() {
        let fault = Fault::wrapped(ErrorKind::TooManyRequests, "slow down");
        let wrapped = fault.as_wrapped().unwrap();
        assert_eq!(wrapped.kind(), ErrorKind::TooManyRequests);
        assert_eq!(wrapped.detail(), "slow down");
        assert!(Fault::Application.as_wrapped().is_none());
    }

    #[test]
    fn test_body_serializes_camel_case() {
        let body = Fault::lookup("index unavailable").to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["faultCode"], -32500);
        assert_eq!(json["faultString"], "LookupError: index unavailable");
    }
}
