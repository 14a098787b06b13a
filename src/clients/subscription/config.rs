//! Subscription client configuration.

use std::time::Duration;

use serde_json::Value;

use crate::config::EndpointUrl;

/// What [`SubscriptionClient::unsubscribe`](super::SubscriptionClient::unsubscribe)
/// does to the shared connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnsubscribeBehavior {
    /// Stop only the given subscription; the connection stays open for the
    /// others.
    #[default]
    SubscriptionOnly,
    /// Stop the subscription and close the shared connection. Every other
    /// subscription receives a connection-closed error.
    CloseConnection,
}

/// Configuration for a [`SubscriptionClient`](super::SubscriptionClient).
///
/// # Defaults
///
/// - `headers`: none (the `Sec-WebSocket-Protocol` header is always sent)
/// - `init_payload`: `None`
/// - `ack_timeout`: 10 seconds
/// - `connect_timeout`: 30 seconds
/// - `keep_alive_interval`: `None` (no client pings)
/// - `unsubscribe_behavior`: [`UnsubscribeBehavior::SubscriptionOnly`]
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gql_transport::clients::subscription::SubscriptionConfig;
/// use gql_transport::EndpointUrl;
/// use serde_json::json;
///
/// let config = SubscriptionConfig::new(EndpointUrl::websocket("wss://api.example.com/graphql").unwrap())
///     .with_header("Authorization", "Bearer token")
///     .with_init_payload(json!({ "token": "abc" }))
///     .with_keep_alive(Duration::from_secs(15));
///
/// assert_eq!(config.ack_timeout(), Duration::from_secs(10));
/// ```
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    endpoint: EndpointUrl,
    headers: Vec<(String, String)>,
    init_payload: Option<Value>,
    ack_timeout: Duration,
    connect_timeout: Duration,
    keep_alive_interval: Option<Duration>,
    unsubscribe_behavior: UnsubscribeBehavior,
}

impl SubscriptionConfig {
    /// Creates a configuration for a `ws`/`wss` endpoint.
    #[must_use]
    pub const fn new(endpoint: EndpointUrl) -> Self {
        Self {
            endpoint,
            headers: Vec::new(),
            init_payload: None,
            ack_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            keep_alive_interval: None,
            unsubscribe_behavior: UnsubscribeBehavior::SubscriptionOnly,
        }
    }

    /// Adds a header to the WebSocket handshake.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the `connection_init` payload (typically credentials).
    #[must_use]
    pub fn with_init_payload(mut self, payload: Value) -> Self {
        self.init_payload = Some(payload);
        self
    }

    /// Sets how long to wait for `connection_ack`.
    #[must_use]
    pub const fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Sets how long to wait for the WebSocket handshake.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sends a `ping` frame at this interval while connected.
    #[must_use]
    pub const fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = Some(interval);
        self
    }

    /// Selects what `unsubscribe` does to the shared connection.
    #[must_use]
    pub const fn with_unsubscribe_behavior(mut self, behavior: UnsubscribeBehavior) -> Self {
        self.unsubscribe_behavior = behavior;
        self
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }

    /// Returns the handshake headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the `connection_init` payload.
    #[must_use]
    pub const fn init_payload(&self) -> Option<&Value> {
        self.init_payload.as_ref()
    }

    /// Returns the `connection_ack` timeout.
    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Returns the WebSocket handshake timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub const fn keep_alive_interval(&self) -> Option<Duration> {
        self.keep_alive_interval
    }

    /// Returns the unsubscribe behavior.
    #[must_use]
    pub const fn unsubscribe_behavior(&self) -> UnsubscribeBehavior {
        self.unsubscribe_behavior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config =
            SubscriptionConfig::new(EndpointUrl::websocket("ws://localhost:4000/graphql").unwrap());

        assert!(config.headers().is_empty());
        assert!(config.init_payload().is_none());
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert!(config.keep_alive_interval().is_none());
        assert_eq!(
            config.unsubscribe_behavior(),
            UnsubscribeBehavior::SubscriptionOnly
        );
    }

    #[test]
    fn test_config_setters() {
        let config =
            SubscriptionConfig::new(EndpointUrl::websocket("ws://localhost:4000/graphql").unwrap())
                .with_header("X-Tenant", "t1")
                .with_ack_timeout(Duration::from_millis(250))
                .with_unsubscribe_behavior(UnsubscribeBehavior::CloseConnection);

        assert_eq!(config.headers(), &[("X-Tenant".to_string(), "t1".to_string())]);
        assert_eq!(config.ack_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.unsubscribe_behavior(),
            UnsubscribeBehavior::CloseConnection
        );
    }
}
