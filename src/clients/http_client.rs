//! HTTP transport for GraphQL requests.
//!
//! This module provides the [`HttpTransport`] abstraction the GraphQL client
//! sends through, and [`HttpClient`], its `reqwest` implementation.
//! Transports perform exactly one exchange per call. Retries, status
//! classification and decoding are the GraphQL client's concern.

use std::fmt;

use async_trait::async_trait;

use crate::clients::errors::{TransportError, TransportErrorKind};
use crate::clients::http_response::TransportResponse;
use crate::config::ClientConfig;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sends a single HTTP request and reads the full response.
///
/// Implementations must return `Err` only for network failures; any
/// response that arrived, whatever its status, is `Ok`. A failure while
/// reading the body must be reported with [`TransportErrorKind::Body`].
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Sends the request.
    async fn send(&self, request: reqwest::Request) -> Result<TransportResponse, TransportError>;
}

/// HTTP transport backed by a `reqwest` client.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gql_transport::clients::HttpClient;
/// use gql_transport::{ClientConfig, EndpointUrl};
///
/// let config = ClientConfig::builder()
///     .endpoint(EndpointUrl::new("https://api.example.com/graphql").unwrap())
///     .timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
///
/// let client = HttpClient::new(&config).unwrap();
/// # let _ = client;
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a transport using the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the TLS backend cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_reqwest(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: reqwest::Request) -> Result<TransportResponse, TransportError> {
        let response = self.client.execute(request).await?;

        let code = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(TransportErrorKind::Body, e.to_string()))?;

        Ok(TransportResponse::new(code, headers, body.to_vec()))
    }
}
