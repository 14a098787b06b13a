//! HTTP response types and the GraphQL response classifier.
//!
//! This module provides the [`TransportResponse`] returned by an
//! [`HttpTransport`](crate::clients::HttpTransport), the
//! [`ResponseCallback`] hook invoked after a successful call, and
//! [`unmarshal`], which classifies a 2xx body into typed data or a
//! [`GqlErrorList`].
//!
//! # Classification
//!
//! A body is parsed as the envelope `{"data": .., "errors": ..}`:
//!
//! - an unparseable body is a [`DecodeError`] carrying the raw bytes
//! - a present, non-empty `errors` array makes the whole body reparse as a
//!   [`GqlErrorList`], and `data` is never decoded
//! - otherwise `data` (null when absent) is decoded into the target type
//!
//! # Example
//!
//! ```rust
//! use gql_transport::clients::{unmarshal, ClientError};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Viewer {
//!     viewer: User,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let ok: Viewer = unmarshal(br#"{"data":{"viewer":{"name":"Ada"}}}"#).unwrap();
//! assert_eq!(ok.viewer.name, "Ada");
//!
//! let denied = unmarshal::<Viewer>(br#"{"errors":[{"message":"not authorized"}]}"#);
//! assert!(matches!(denied, Err(ClientError::Graphql(_))));
//! ```

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::clients::context::CallContext;
use crate::clients::errors::{ClientError, DecodeError};
use crate::clients::graphql::GqlErrorList;

const DATA_CONTEXT: &str = "failed to decode data";
const ERRORS_CONTEXT: &str = "failed to decode errors";

/// A response as read off the wire by an
/// [`HttpTransport`](crate::clients::HttpTransport).
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// HTTP status code.
    pub code: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a new response.
    #[must_use]
    pub const fn new(code: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            code,
            headers,
            body,
        }
    }

    /// Returns `true` if the status code is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the body as (lossy) UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A hook invoked with the response of every successful call.
///
/// Callbacks run after the body has been decoded, once per successful call.
/// Responses from discarded attempts are never observed. Any
/// `Fn(&CallContext, &TransportResponse)` closure is a callback.
pub trait ResponseCallback: Send + Sync {
    /// Observes the response.
    fn on_response(&self, ctx: &CallContext, response: &TransportResponse);
}

impl<F> ResponseCallback for F
where
    F: Fn(&CallContext, &TransportResponse) + Send + Sync,
{
    fn on_response(&self, ctx: &CallContext, response: &TransportResponse) {
        self(ctx, response);
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

impl Envelope {
    fn has_errors(&self) -> bool {
        match &self.errors {
            None | Some(Value::Null) => false,
            Some(Value::Array(errors)) => !errors.is_empty(),
            Some(_) => true,
        }
    }
}

/// Classifies a 2xx response body.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] if the body is not a GraphQL response or
/// `data` does not fit `T`, and [`ClientError::Graphql`] if the server
/// reported errors.
pub fn unmarshal<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| DecodeError::new(DATA_CONTEXT, body, e))?;

    if envelope.has_errors() {
        let errors: GqlErrorList =
            serde_json::from_slice(body).map_err(|e| DecodeError::new(ERRORS_CONTEXT, body, e))?;
        return Err(ClientError::Graphql(errors));
    }

    let data = envelope.data.unwrap_or(Value::Null);
    serde_json::from_value(data).map_err(|e| DecodeError::new(DATA_CONTEXT, body, e).into())
}

/// Classifies an already-parsed GraphQL response, with the same rules as
/// [`unmarshal`].
///
/// # Errors
///
/// See [`unmarshal`].
pub fn unmarshal_value<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    let raw = || serde_json::to_vec(&value).unwrap_or_default();

    let envelope: Envelope = serde_json::from_value(value.clone())
        .map_err(|e| DecodeError::new(DATA_CONTEXT, raw(), e))?;

    if envelope.has_errors() {
        let errors: GqlErrorList = serde_json::from_value(value.clone())
            .map_err(|e| DecodeError::new(ERRORS_CONTEXT, raw(), e))?;
        return Err(ClientError::Graphql(errors));
    }

    let data = envelope.data.unwrap_or(Value::Null);
    serde_json::from_value(data).map_err(|e| DecodeError::new(DATA_CONTEXT, raw(), e).into())
}
