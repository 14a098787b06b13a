//! Configuration types for the GraphQL transport client.
//!
//! This module provides the configuration consumed at construction time by
//! [`GraphqlClient`](crate::clients::GraphqlClient). The client never reads
//! configuration files itself; callers build a [`ClientConfig`] in code (or
//! deserialize an [`EndpointUrl`] from their own settings) and hand it over.
//!
//! # Overview
//!
//! - [`ClientConfig`]: endpoint, static headers, timeouts and retry policy
//! - [`ClientConfigBuilder`]: a builder for constructing [`ClientConfig`] instances
//! - [`EndpointUrl`]: a validated HTTP(S) or WebSocket endpoint URL
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use gql_transport::{ClientConfig, EndpointUrl};
//!
//! let config = ClientConfig::builder()
//!     .endpoint(EndpointUrl::new("https://api.example.com/graphql").unwrap())
//!     .header("Authorization", "Bearer token")
//!     .timeout(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.endpoint().host_name(), "api.example.com");
//! ```

mod newtypes;

pub use newtypes::EndpointUrl;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::clients::{RetryPolicy, SDK_VERSION};
use crate::error::ConfigError;

/// Configuration for a [`GraphqlClient`](crate::clients::GraphqlClient).
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    endpoint: EndpointUrl,
    headers: HeaderMap,
    user_agent_prefix: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_policy: RetryPolicy,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the GraphQL endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }

    /// Returns the static headers sent with every request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the full `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> String {
        let prefix = self
            .user_agent_prefix
            .as_deref()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        format!("{prefix}gql-transport v{SDK_VERSION}")
    }

    /// Returns the per-attempt request timeout, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the TCP connect timeout, if configured.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Returns the retry policy for transient network failures.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// The only required field is `endpoint`.
///
/// # Defaults
///
/// - `headers`: none
/// - `user_agent_prefix`: `None`
/// - `timeout`: `None` (no per-attempt timeout)
/// - `connect_timeout`: `None`
/// - `retry_policy`: [`RetryPolicy::default`] (3 attempts, exponential backoff)
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<EndpointUrl>,
    headers: Vec<(String, String)>,
    user_agent_prefix: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GraphQL endpoint (required).
    #[must_use]
    pub fn endpoint(mut self, endpoint: EndpointUrl) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Adds a static header sent with every request.
    ///
    /// Headers are validated when [`build`](Self::build) is called. Adding the
    /// same name twice keeps the last value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the user agent prefix.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the per-attempt request timeout.
    ///
    /// A timed-out attempt is a transient network failure and is retried
    /// according to the retry policy.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Builds the [`ClientConfig`], validating headers and the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `endpoint` is not set,
    /// [`ConfigError::InvalidHeader`] if a header name or value or the user
    /// agent prefix is not a valid header value, and
    /// [`ConfigError::InvalidRetryPolicy`] if the retry policy is inconsistent.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let endpoint = self
            .endpoint
            .ok_or(ConfigError::MissingRequiredField { field: "endpoint" })?;

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        if let Some(prefix) = &self.user_agent_prefix {
            HeaderValue::from_str(prefix).map_err(|e| ConfigError::InvalidHeader {
                name: USER_AGENT.to_string(),
                reason: e.to_string(),
            })?;
        }

        let retry_policy = self.retry_policy.unwrap_or_default();
        retry_policy.validate()?;

        Ok(ClientConfig {
            endpoint,
            headers,
            user_agent_prefix: self.user_agent_prefix,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            retry_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointUrl {
        EndpointUrl::new("https://api.example.com/graphql").unwrap()
    }

    #[test]
    fn test_builder_requires_endpoint() {
        let result = ClientConfigBuilder::new().build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "endpoint" })
        ));
    }

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = ClientConfig::builder().endpoint(endpoint()).build().unwrap();

        assert!(config.headers().is_empty());
        assert!(config.user_agent_prefix().is_none());
        assert!(config.timeout().is_none());
        assert!(config.connect_timeout().is_none());
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
    }

    #[test]
    fn test_builder_collects_static_headers() {
        let config = ClientConfig::builder()
            .endpoint(endpoint())
            .header("Authorization", "Bearer abc")
            .header("X-Tenant", "first")
            .header("X-Tenant", "second")
            .build()
            .unwrap();

        assert_eq!(config.headers().len(), 2);
        assert_eq!(config.headers()["authorization"], "Bearer abc");
        assert_eq!(config.headers()["x-tenant"], "second");
    }

    #[test]
    fn test_builder_rejects_invalid_header_name() {
        let result = ClientConfig::builder()
            .endpoint(endpoint())
            .header("Bad Header", "value")
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidHeader { ref name, .. }) if name == "Bad Header"
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_header_value() {
        let result = ClientConfig::builder()
            .endpoint(endpoint())
            .header("X-Token", "line\nbreak")
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));
    }

    #[test]
    fn test_builder_validates_retry_policy() {
        let result = ClientConfig::builder()
            .endpoint(endpoint())
            .retry_policy(RetryPolicy::immediate(0))
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidRetryPolicy { .. })));
    }

    #[test]
    fn test_user_agent_with_prefix() {
        let config = ClientConfig::builder()
            .endpoint(endpoint())
            .user_agent_prefix("MyApp/1.0")
            .build()
            .unwrap();

        let user_agent = config.user_agent();
        assert!(user_agent.starts_with("MyApp/1.0 | "));
        assert!(user_agent.contains("gql-transport v"));
    }

    #[test]
    fn test_builder_rejects_invalid_user_agent_prefix() {
        let result = ClientConfig::builder()
            .endpoint(endpoint())
            .user_agent_prefix("MyApp\n1.0")
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidHeader { ref name, .. }) if name == "user-agent"
        ));
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientConfig>();
    }
}
