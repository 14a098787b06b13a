//! Error types for GraphQL calls.
//!
//! This module contains the error taxonomy returned by
//! [`GraphqlClient::post`](crate::clients::GraphqlClient::post) and its
//! building blocks.
//!
//! # Error Handling
//!
//! Only transient network failures are recovered locally (by rotating the
//! client pool and retrying). Every other class is returned immediately,
//! carrying enough context to diagnose it:
//!
//! - [`BuildError`]: the request could not be serialized or addressed
//! - [`ClientError::Cancelled`] / [`ClientError::DeadlineExceeded`]: the caller gave up
//! - [`TransportError`]: a network failure, transient unless it hit the response body
//! - [`HttpStatusError`]: the server answered with a non-2xx status
//! - [`DecodeError`]: the body was not a valid GraphQL response for the requested type
//! - [`GqlErrorList`]: the server answered 2xx with GraphQL errors
//! - [`PoolExhaustedError`]: no backend was left to rotate to
//!
//! # Example
//!
//! ```rust,ignore
//! use gql_transport::clients::ClientError;
//!
//! match client.query::<Viewer>(&ctx, "{ viewer { id name } }").await {
//!     Ok(viewer) => println!("Hello {}", viewer.name),
//!     Err(ClientError::Graphql(errors)) => {
//!         for message in errors.messages() {
//!             println!("GraphQL error: {message}");
//!         }
//!     }
//!     Err(ClientError::HttpStatus(e)) => println!("HTTP {}: {}", e.code, e.message),
//!     Err(e) => println!("Request failed: {e}"),
//! }
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::clients::graphql::{ErrorResponse, GqlErrorList};
use crate::error::ConfigError;

/// Maximum number of body bytes kept in a status error message.
const MAX_STATUS_BODY_LEN: usize = 4096;

/// Error returned when a request cannot be built.
///
/// Building never touches the network, so these errors are never retried.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The query text is empty.
    #[error("GraphQL query cannot be empty")]
    EmptyQuery,

    /// The variables (or the request envelope) could not be serialized.
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// The variables serialized to something other than a JSON object.
    #[error("GraphQL variables must serialize to a JSON object, got {kind}")]
    VariablesNotObject {
        /// The JSON kind the variables produced.
        kind: &'static str,
    },

    /// The endpoint provided by the client pool is not a valid URL.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint string.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The host provided by the client pool is not a valid `Host` header value.
    #[error("invalid host '{host}'")]
    InvalidHost {
        /// The host string.
        host: String,
    },
}

/// The class of a network failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The attempt timed out at the socket or client level.
    Timeout,
    /// The request could not be written.
    Request,
    /// The response headers arrived but the body could not be read.
    Body,
    /// Any other transport failure.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A network failure reported by an [`HttpTransport`](crate::clients::HttpTransport).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    /// The failure class.
    pub kind: TransportErrorKind,
    /// A description of the failure.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` if the failure may be retried against another backend.
    ///
    /// A failure while reading the response body is not transient: the server
    /// has already processed the request.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self.kind, TransportErrorKind::Body)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Error returned when the server answers with a non-2xx status.
///
/// `message` holds the response body (truncated to 4 KiB), or the canonical
/// reason phrase when the body is empty.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("http status code: {code}: {message}")]
pub struct HttpStatusError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The response body or reason phrase.
    pub message: String,
}

impl HttpStatusError {
    /// Builds a status error from a status code and raw response body.
    #[must_use]
    pub fn from_body(code: u16, body: &[u8]) -> Self {
        let message = if body.is_empty() {
            reqwest::StatusCode::from_u16(code)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or_default()
                .to_string()
        } else {
            truncate_body(body)
        };
        Self { code, message }
    }
}

/// Error returned when a response body cannot be decoded.
///
/// The raw body is kept verbatim for diagnostics.
#[derive(Debug, Error)]
#[error("{context} {}: {source}", String::from_utf8_lossy(.raw))]
pub struct DecodeError {
    /// What was being decoded.
    pub context: &'static str,
    /// The raw response body.
    pub raw: Vec<u8>,
    /// The underlying JSON error.
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    /// Creates a decode error.
    #[must_use]
    pub fn new(context: &'static str, raw: impl Into<Vec<u8>>, source: serde_json::Error) -> Self {
        Self {
            context,
            raw: raw.into(),
            source,
        }
    }

    /// Returns the raw body as (lossy) UTF-8.
    #[must_use]
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// Error returned when a client pool has no backend left to rotate to.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("client pool exhausted: no usable backend among {backends} (last failure: {reason})")]
pub struct PoolExhaustedError {
    /// The number of backends the pool manages.
    pub backends: usize,
    /// The failure that triggered the last refresh.
    pub reason: String,
}

/// Unified error type for GraphQL calls.
///
/// Use pattern matching to handle specific error classes, or
/// [`error_response`](Self::error_response) to project the error into its
/// network/GraphQL halves.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be built.
    #[error("don't create request: {0}")]
    Build(#[from] BuildError),

    /// The caller cancelled the call.
    #[error("request failed: context canceled")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("request failed: context deadline exceeded")]
    DeadlineExceeded,

    /// A network failure that must not be retried.
    #[error("request failed: {0}")]
    Transport(TransportError),

    /// Transient network failures persisted past the retry policy.
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// The number of attempts made.
        attempts: u32,
        /// The last transient failure.
        #[source]
        last: TransportError,
    },

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    HttpStatus(#[from] HttpStatusError),

    /// The response body could not be decoded.
    #[error("failed to decode data {0}")]
    Decode(#[from] DecodeError),

    /// The server answered with GraphQL errors.
    #[error("{0}")]
    Graphql(#[from] GqlErrorList),

    /// The client pool could not provide another backend.
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhaustedError),

    /// The client could not be constructed from its configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns `true` for errors that triggered (or would trigger) a retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Returns `true` if the caller cancelled the call or its deadline passed.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Projects the error into an [`ErrorResponse`].
    ///
    /// Status errors map to [`ErrorResponse::Network`], GraphQL errors to
    /// [`ErrorResponse::Graphql`], everything else to [`ErrorResponse::Empty`].
    #[must_use]
    pub fn error_response(&self) -> ErrorResponse {
        match self {
            Self::HttpStatus(error) => ErrorResponse::Network(error.clone()),
            Self::Graphql(list) => ErrorResponse::Graphql(list.clone()),
            _ => ErrorResponse::Empty,
        }
    }
}

fn truncate_body(bytes: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(bytes).into_owned();
    if body.len() > MAX_STATUS_BODY_LEN {
        let mut end = MAX_STATUS_BODY_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_failure() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{").unwrap_err()
    }

    #[test]
    fn test_status_error_uses_reason_for_empty_body() {
        let error = HttpStatusError::from_body(503, b"");
        assert_eq!(error.code, 503);
        assert_eq!(error.message, "Service Unavailable");
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn test_status_error_keeps_body() {
        let error = HttpStatusError::from_body(400, br#"{"error":"bad"}"#);
        assert_eq!(error.message, r#"{"error":"bad"}"#);
    }

    #[test]
    fn test_status_error_truncates_large_bodies() {
        let body = "é".repeat(4000);
        let error = HttpStatusError::from_body(500, body.as_bytes());
        assert!(error.message.len() <= MAX_STATUS_BODY_LEN + '…'.len_utf8());
        assert!(error.message.ends_with('…'));
    }

    #[test]
    fn test_decode_error_keeps_raw_body_verbatim() {
        let raw = b"<html>bad gateway</html>".to_vec();
        let error = DecodeError::new("failed to decode data", raw.clone(), decode_failure());
        assert_eq!(error.raw, raw);
        assert!(error.to_string().contains("<html>bad gateway</html>"));
        assert_eq!(error.raw_text(), "<html>bad gateway</html>");
    }

    #[test]
    fn test_transport_error_transience() {
        assert!(TransportError::new(TransportErrorKind::Connect, "refused").is_transient());
        assert!(TransportError::new(TransportErrorKind::Timeout, "slow").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Body, "reset").is_transient());
    }

    #[test]
    fn test_error_response_projection() {
        let status: ClientError = HttpStatusError::from_body(502, b"").into();
        assert!(status.error_response().network_error().is_some());

        let graphql: ClientError = GqlErrorList::new(Vec::new()).into();
        assert!(graphql.error_response().graphql_errors().is_some());

        assert!(!ClientError::Cancelled.error_response().has_errors());
        assert!(ClientError::Cancelled.is_interrupted());
    }

    #[test]
    fn test_retries_exhausted_is_transient() {
        let error = ClientError::RetriesExhausted {
            attempts: 3,
            last: TransportError::new(TransportErrorKind::Connect, "refused"),
        };
        assert!(error.is_transient());
        assert!(error.to_string().contains("3 attempts"));
        assert!(!ClientError::DeadlineExceeded.is_transient());
    }

    #[test]
    fn test_error_types_implement_std_error() {
        let build: &dyn std::error::Error = &BuildError::EmptyQuery;
        let _ = build;

        let pool: &dyn std::error::Error = &PoolExhaustedError {
            backends: 2,
            reason: "connect error".to_string(),
        };
        let _ = pool;

        let client: &dyn std::error::Error = &ClientError::Cancelled;
        let _ = client;
    }
}
