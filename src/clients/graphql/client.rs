//! GraphQL client implementation.
//!
//! This module provides the [`GraphqlClient`] type, which executes GraphQL
//! operations over HTTP against the backends of a
//! [`ClientPool`](crate::clients::ClientPool).

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::clients::context::CallContext;
use crate::clients::errors::{ClientError, HttpStatusError};
use crate::clients::http_client::HttpClient;
use crate::clients::http_request::{build_request, GraphqlRequest, RequestOption, StaticHeaders};
use crate::clients::http_response::{unmarshal, ResponseCallback};
use crate::clients::pool::{ClientPool, DefaultClientPool};
use crate::clients::retry::{RetryDecision, RetryPolicy};
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// GraphQL client over HTTP.
///
/// Every attempt takes one lease (endpoint, transport and host) from the pool,
/// rebuilds the request and reapplies the request options. Transient
/// network failures refresh the pool and are retried according to the
/// [`RetryPolicy`]. Everything else is returned as-is.
///
/// # Thread Safety
///
/// `GraphqlClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use gql_transport::clients::{CallContext, GraphqlClient};
/// use gql_transport::{ClientConfig, EndpointUrl};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct ViewerData {
///     viewer: Viewer,
/// }
///
/// #[derive(Deserialize)]
/// struct Viewer {
///     id: String,
///     name: String,
/// }
///
/// let config = ClientConfig::builder()
///     .endpoint(EndpointUrl::new("https://api.example.com/graphql")?)
///     .header("Authorization", "Bearer token")
///     .build()?;
/// let client = GraphqlClient::from_config(&config)?;
///
/// let ctx = CallContext::new();
/// let data: ViewerData = client.query(&ctx, "{ viewer { id name } }").await?;
///
/// let data: ViewerData = client
///     .post(
///         &ctx,
///         "query($id: ID!) { viewer(id: $id) { id name } }",
///         Some(&json!({ "id": "u1" })),
///         &[],
///         &[],
///     )
///     .await?;
/// ```
pub struct GraphqlClient {
    pool: Arc<dyn ClientPool>,
    retry_policy: RetryPolicy,
    request_options: Vec<Arc<dyn RequestOption>>,
    response_callbacks: Vec<Arc<dyn ResponseCallback>>,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("pool", &self.pool)
            .field("retry_policy", &self.retry_policy)
            .field("request_options", &self.request_options.len())
            .field("response_callbacks", &self.response_callbacks.len())
            .finish()
    }
}

impl GraphqlClient {
    /// Creates a client for a single endpoint from `config`.
    ///
    /// The configured static headers and `User-Agent` are installed as the
    /// first instance request option.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP transport cannot be
    /// initialized.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpClient::new(config).map_err(ClientError::Transport)?;
        let pool = DefaultClientPool::new(config.endpoint().clone(), Arc::new(transport));

        Ok(Self {
            pool: Arc::new(pool),
            retry_policy: config.retry_policy().clone(),
            request_options: vec![Arc::new(StaticHeaders::from_config(config))],
            response_callbacks: Vec::new(),
        })
    }

    /// Creates a builder around an existing pool.
    #[must_use]
    pub fn builder(pool: Arc<dyn ClientPool>) -> GraphqlClientBuilder {
        GraphqlClientBuilder::new(pool)
    }

    /// Returns the client pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<dyn ClientPool> {
        &self.pool
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Executes a query without variables or per-call hooks.
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn query<T>(&self, ctx: &CallContext, query: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.post::<T, Value>(ctx, query, None, &[], &[]).await
    }

    /// Executes a GraphQL operation and decodes `data` into `T`.
    ///
    /// `request_options` run after the client's own options on every
    /// attempt. `response_callbacks` run after the client's own callbacks,
    /// once, when the call succeeds.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Build`] if the request cannot be encoded or addressed
    /// - [`ClientError::Cancelled`] / [`ClientError::DeadlineExceeded`] if `ctx` fires
    /// - [`ClientError::RetriesExhausted`] if transient failures outlast the retry policy
    /// - [`ClientError::PoolExhausted`] if the pool has no backend left
    /// - [`ClientError::Transport`] for a non-transient network failure
    /// - [`ClientError::HttpStatus`] for a non-2xx status
    /// - [`ClientError::Decode`] / [`ClientError::Graphql`] from the response body
    pub async fn post<T, V>(
        &self,
        ctx: &CallContext,
        query: &str,
        variables: Option<&V>,
        request_options: &[Arc<dyn RequestOption>],
        response_callbacks: &[Arc<dyn ResponseCallback>],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        let request = GraphqlRequest::new(query, variables)?;
        self.post_request(ctx, &request, request_options, response_callbacks)
            .await
    }

    /// Executes a prepared [`GraphqlRequest`].
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn post_request<T>(
        &self,
        ctx: &CallContext,
        request: &GraphqlRequest,
        request_options: &[Arc<dyn RequestOption>],
        response_callbacks: &[Arc<dyn ResponseCallback>],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            ctx.check()?;

            let lease = self.pool.acquire();
            let http_request = build_request(
                ctx,
                &lease.host,
                &lease.endpoint,
                request,
                &self.request_options,
                request_options,
            )?;

            tracing::debug!(
                attempt,
                endpoint = %lease.endpoint,
                host = %lease.host,
                "sending GraphQL request"
            );

            let outcome = tokio::select! {
                biased;
                error = ctx.interrupted() => return Err(error),
                outcome = lease.transport.send(http_request) => outcome,
            };

            let response = match outcome {
                Ok(response) => response,
                Err(error) if error.is_transient() => {
                    tracing::warn!(
                        attempt,
                        endpoint = %lease.endpoint,
                        %error,
                        "transient network failure"
                    );
                    self.pool.refresh(&lease, &error.to_string())?;

                    match self.retry_policy.decide(attempt) {
                        RetryDecision::RetryAfter(delay) => {
                            ctx.sleep(delay).await?;
                            continue;
                        }
                        RetryDecision::DoNotRetry => {
                            return Err(ClientError::RetriesExhausted {
                                attempts: attempt,
                                last: error,
                            });
                        }
                    }
                }
                Err(error) => return Err(ClientError::Transport(error)),
            };

            if !response.is_success() {
                return Err(HttpStatusError::from_body(response.code, &response.body).into());
            }

            let data = unmarshal(&response.body)?;

            for callback in self.response_callbacks.iter().chain(response_callbacks) {
                callback.on_response(ctx, &response);
            }

            return Ok(data);
        }
    }
}

/// Builder for [`GraphqlClient`] instances over a custom pool.
///
/// # Defaults
///
/// - `retry_policy`: [`RetryPolicy::default`]
/// - no instance request options or response callbacks
pub struct GraphqlClientBuilder {
    pool: Arc<dyn ClientPool>,
    retry_policy: Option<RetryPolicy>,
    request_options: Vec<Arc<dyn RequestOption>>,
    response_callbacks: Vec<Arc<dyn ResponseCallback>>,
}

impl fmt::Debug for GraphqlClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClientBuilder")
            .field("pool", &self.pool)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl GraphqlClientBuilder {
    fn new(pool: Arc<dyn ClientPool>) -> Self {
        Self {
            pool,
            retry_policy: None,
            request_options: Vec::new(),
            response_callbacks: Vec::new(),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Appends an instance request option. Options run in the order added.
    #[must_use]
    pub fn request_option(mut self, option: Arc<dyn RequestOption>) -> Self {
        self.request_options.push(option);
        self
    }

    /// Appends an instance response callback. Callbacks run in the order added.
    #[must_use]
    pub fn response_callback(mut self, callback: Arc<dyn ResponseCallback>) -> Self {
        self.response_callbacks.push(callback);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPolicy`] if the retry policy is
    /// inconsistent.
    pub fn build(self) -> Result<GraphqlClient, ConfigError> {
        let retry_policy = self.retry_policy.unwrap_or_default();
        retry_policy.validate()?;

        Ok(GraphqlClient {
            pool: self.pool,
            retry_policy,
            request_options: self.request_options,
            response_callbacks: self.response_callbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointUrl;
    use std::time::Duration;

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .endpoint(EndpointUrl::new("https://api.example.com/graphql").unwrap())
            .retry_policy(RetryPolicy::immediate(5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_from_config_uses_config_policy() {
        let client = GraphqlClient::from_config(&config()).unwrap();

        assert_eq!(client.retry_policy(), &RetryPolicy::immediate(5));
        assert_eq!(client.pool().host(), "api.example.com");
        assert_eq!(client.request_options.len(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_policy() {
        let transport = HttpClient::new(&config()).unwrap();
        let pool: Arc<dyn ClientPool> = Arc::new(DefaultClientPool::new(
            EndpointUrl::new("https://api.example.com/graphql").unwrap(),
            Arc::new(transport),
        ));

        let result = GraphqlClient::builder(pool)
            .retry_policy(
                RetryPolicy::default().with_backoff(Duration::from_secs(2), Duration::from_secs(1)),
            )
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidRetryPolicy { .. })));
    }

    #[tokio::test]
    async fn test_empty_query_fails_before_any_attempt() {
        let client = GraphqlClient::from_config(&config()).unwrap();
        let result = client.query::<Value>(&CallContext::new(), "").await;

        assert!(matches!(
            result,
            Err(ClientError::Build(crate::clients::errors::BuildError::EmptyQuery))
        ));
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GraphqlClient>();
    }
}
