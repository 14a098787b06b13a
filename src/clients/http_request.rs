//! GraphQL request types and the HTTP request builder.
//!
//! This module provides the [`GraphqlRequest`] wire envelope, the
//! [`RequestOption`] hook applied to every outgoing request, and
//! [`build_request`], which turns a request into a `reqwest::Request`
//! addressed at an endpoint and host supplied by the client pool.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, HOST, USER_AGENT};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::context::CallContext;
use crate::clients::errors::BuildError;
use crate::config::ClientConfig;

/// Content type sent and accepted on every GraphQL request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A GraphQL operation as sent on the wire.
///
/// Serializes to `{"query": .., "variables": .., "operationName": ..}`.
/// `variables` is omitted when absent or empty, `operationName` when unset.
///
/// # Example
///
/// ```rust
/// use gql_transport::clients::GraphqlRequest;
/// use serde_json::json;
///
/// let request = GraphqlRequest::new(
///     "query Viewer($id: ID!) { node(id: $id) { id } }",
///     Some(&json!({ "id": "1" })),
/// )
/// .unwrap()
/// .with_operation_name("Viewer");
///
/// let body = serde_json::to_value(&request).unwrap();
/// assert_eq!(body["variables"]["id"], "1");
/// assert_eq!(body["operationName"], "Viewer");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variables: Option<Map<String, Value>>,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    operation_name: Option<String>,
}

impl GraphqlRequest {
    /// Creates a request from query text and optional variables.
    ///
    /// The variables may be any serializable value that produces a JSON
    /// object (or `null`).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::EmptyQuery`] if the query is blank,
    /// [`BuildError::Encode`] if the variables fail to serialize, and
    /// [`BuildError::VariablesNotObject`] if they serialize to anything
    /// other than an object.
    pub fn new<V>(query: impl Into<String>, variables: Option<&V>) -> Result<Self, BuildError>
    where
        V: Serialize + ?Sized,
    {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(BuildError::EmptyQuery);
        }

        let variables = match variables {
            Some(variables) => match serde_json::to_value(variables)? {
                Value::Null => None,
                Value::Object(map) if map.is_empty() => None,
                Value::Object(map) => Some(map),
                other => {
                    return Err(BuildError::VariablesNotObject {
                        kind: json_kind(&other),
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            query,
            variables,
            operation_name: None,
        })
    }

    /// Sets the operation name. An empty name clears it.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.operation_name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Returns the query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the variables, if any.
    #[must_use]
    pub const fn variables(&self) -> Option<&Map<String, Value>> {
        self.variables.as_ref()
    }

    /// Returns the operation name, if any.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The mutable head of an outgoing request, as seen by a [`RequestOption`].
///
/// Options may change headers and the per-attempt timeout. The URL and host
/// are read-only and the body is not reachable.
pub struct RequestHead<'a> {
    request: &'a mut reqwest::Request,
    host: &'a str,
}

impl RequestHead<'_> {
    /// Returns the endpoint URL the request is addressed to.
    #[must_use]
    pub fn url(&self) -> &Url {
        self.request.url()
    }

    /// Returns the host the request was stamped with.
    #[must_use]
    pub const fn host(&self) -> &str {
        self.host
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns the request headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.request.headers_mut()
    }

    /// Sets a timeout for this attempt.
    pub fn set_timeout(&mut self, timeout: Duration) {
        *self.request.timeout_mut() = Some(timeout);
    }
}

impl fmt::Debug for RequestHead<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHead")
            .field("url", &self.request.url().as_str())
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// A hook applied to every outgoing request before it is sent.
///
/// Options run on every attempt, including retries. Any
/// `Fn(&CallContext, &mut RequestHead<'_>)` closure is an option.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gql_transport::clients::{CallContext, RequestHead, RequestOption};
///
/// let trace: Arc<dyn RequestOption> =
///     Arc::new(|_: &CallContext, head: &mut RequestHead<'_>| {
///         head.headers_mut()
///             .insert("x-trace-id", "abc123".parse().unwrap());
///     });
/// # let _ = trace;
/// ```
pub trait RequestOption: Send + Sync {
    /// Mutates the request head.
    fn apply(&self, ctx: &CallContext, head: &mut RequestHead<'_>);
}

impl<F> RequestOption for F
where
    F: Fn(&CallContext, &mut RequestHead<'_>) + Send + Sync,
{
    fn apply(&self, ctx: &CallContext, head: &mut RequestHead<'_>) {
        self(ctx, head);
    }
}

/// A request option that stamps a fixed set of headers on every request.
#[derive(Clone, Debug, Default)]
pub struct StaticHeaders {
    headers: HeaderMap,
}

impl StaticHeaders {
    /// Creates the option from a header map.
    #[must_use]
    pub const fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Creates the option from a client configuration: the configured static
    /// headers plus the `User-Agent` header.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut headers = config.headers().clone();
        if let Ok(user_agent) = HeaderValue::from_str(&config.user_agent()) {
            headers.insert(USER_AGENT, user_agent);
        }
        Self { headers }
    }

    /// Adds a header, replacing any existing value.
    #[must_use]
    pub fn with(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl RequestOption for StaticHeaders {
    fn apply(&self, _ctx: &CallContext, head: &mut RequestHead<'_>) {
        for (name, value) in &self.headers {
            head.headers_mut().insert(name.clone(), value.clone());
        }
    }
}

/// Builds the HTTP request for one attempt.
///
/// The request is a `POST` of the JSON-encoded `request` to `endpoint`, with
/// the `Host` header set to `host`. Instance options run before call
/// options. `Content-Type` and `Accept` are set last so options cannot
/// override them.
///
/// # Errors
///
/// Returns [`BuildError::Encode`] if the body cannot be serialized,
/// [`BuildError::InvalidEndpoint`] if `endpoint` is not a URL and
/// [`BuildError::InvalidHost`] if `host` is not a valid header value.
pub fn build_request(
    ctx: &CallContext,
    host: &str,
    endpoint: &str,
    request: &GraphqlRequest,
    instance_options: &[Arc<dyn RequestOption>],
    call_options: &[Arc<dyn RequestOption>],
) -> Result<reqwest::Request, BuildError> {
    let body = serde_json::to_vec(request)?;

    let url = Url::parse(endpoint).map_err(|e| BuildError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    let host_value = HeaderValue::from_str(host).map_err(|_| BuildError::InvalidHost {
        host: host.to_string(),
    })?;

    let mut http_request = reqwest::Request::new(Method::POST, url);
    *http_request.body_mut() = Some(body.into());
    http_request.headers_mut().insert(HOST, host_value);

    {
        let mut head = RequestHead {
            request: &mut http_request,
            host,
        };
        for option in instance_options.iter().chain(call_options) {
            option.apply(ctx, &mut head);
        }
    }

    let headers = http_request.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

    Ok(http_request)
}
