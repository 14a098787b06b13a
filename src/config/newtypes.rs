//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use reqwest::Url;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated GraphQL endpoint URL.
///
/// HTTP endpoints are created with [`EndpointUrl::new`] and accept the `http`
/// and `https` schemes. Subscription endpoints are created with
/// [`EndpointUrl::websocket`] and accept `ws` and `wss`.
///
/// The URL must be absolute and carry a host. The host (without port) and the
/// authority (host plus an explicit, non-default port) are exposed separately
/// because the transport target and the logical `Host` header may differ when
/// a pool balances across several addresses.
///
/// # Serialization
///
/// `EndpointUrl` serializes to and deserializes from the URL string. Only HTTP
/// endpoints round-trip through `Deserialize`.
///
/// # Example
///
/// ```rust
/// use gql_transport::EndpointUrl;
///
/// let endpoint = EndpointUrl::new("https://api.example.com/graphql").unwrap();
/// assert_eq!(endpoint.scheme(), "https");
/// assert_eq!(endpoint.host_name(), "api.example.com");
/// assert_eq!(endpoint.authority(), "api.example.com");
///
/// let local = EndpointUrl::new("http://localhost:8080/query").unwrap();
/// assert_eq!(local.authority(), "localhost:8080");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointUrl {
    url: Url,
}

impl EndpointUrl {
    const HTTP_SCHEMES: &'static [&'static str] = &["http", "https"];
    const WEBSOCKET_SCHEMES: &'static [&'static str] = &["ws", "wss"];

    /// Creates a new validated HTTP(S) endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpointUrl`] if the URL does not parse or
    /// has no host, and [`ConfigError::UnsupportedScheme`] if the scheme is
    /// not `http` or `https`.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::parse(url.into(), Self::HTTP_SCHEMES, "http, https")
    }

    /// Creates a new validated WebSocket endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpointUrl`] if the URL does not parse or
    /// has no host, and [`ConfigError::UnsupportedScheme`] if the scheme is
    /// not `ws` or `wss`.
    pub fn websocket(url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::parse(url.into(), Self::WEBSOCKET_SCHEMES, "ws, wss")
    }

    fn parse(
        url: String,
        allowed: &[&str],
        expected: &'static str,
    ) -> Result<Self, ConfigError> {
        let url = url.trim().to_string();
        let parsed =
            Url::parse(&url).map_err(|_| ConfigError::InvalidEndpointUrl { url: url.clone() })?;

        if !allowed.contains(&parsed.scheme()) {
            return Err(ConfigError::UnsupportedScheme { url, expected });
        }

        match parsed.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { url: parsed }),
            _ => Err(ConfigError::InvalidEndpointUrl { url }),
        }
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Returns the host name portion of the URL, without port.
    #[must_use]
    pub fn host_name(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Returns the value suitable for a `Host` header.
    ///
    /// The port is included only when it is explicit and differs from the
    /// scheme default.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.host_name()),
            None => self.host_name().to_string(),
        }
    }

    /// Returns `true` for `ws` and `wss` endpoints.
    #[must_use]
    pub fn is_websocket(&self) -> bool {
        Self::WEBSOCKET_SCHEMES.contains(&self.url.scheme())
    }

    /// Returns the parsed URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl AsRef<str> for EndpointUrl {
    fn as_ref(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl FromStr for EndpointUrl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for EndpointUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.url.as_str())
    }
}

impl<'de> Deserialize<'de> for EndpointUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}
