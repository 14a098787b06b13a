//! Client types for GraphQL transport.
//!
//! This module provides the HTTP and WebSocket client layers: building
//! requests, sending them through a pool of backends, classifying responses
//! and delivering subscription events.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`GraphqlClient`]: executes GraphQL operations over HTTP
//! - [`CallContext`] / [`CancellationToken`]: per-call cancellation and deadline
//! - [`GraphqlRequest`]: the `{query, variables, operationName}` wire envelope
//! - [`RequestOption`] / [`ResponseCallback`]: hooks around every call
//! - [`HttpTransport`] / [`HttpClient`]: one HTTP exchange, via `reqwest`
//! - [`ClientPool`]: [`DefaultClientPool`] and [`RotatingClientPool`]
//! - [`RetryPolicy`]: bounded retry of transient network failures
//! - [`ClientError`]: the error taxonomy of a call
//! - [`subscription::SubscriptionClient`]: GraphQL subscriptions over WebSocket
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use gql_transport::clients::{CallContext, GraphqlClient};
//! use gql_transport::{ClientConfig, EndpointUrl};
//! use serde_json::Value;
//!
//! let config = ClientConfig::builder()
//!     .endpoint(EndpointUrl::new("https://api.example.com/graphql")?)
//!     .build()?;
//! let client = GraphqlClient::from_config(&config)?;
//!
//! let ctx = CallContext::new().with_timeout(Duration::from_secs(10));
//! let data: Value = client.query(&ctx, "{ viewer { id } }").await?;
//! ```
//!
//! # Retry Behavior
//!
//! Only transient network failures (connect, timeout, request write) are
//! retried. Each one refreshes the pool, then the [`RetryPolicy`] decides
//! whether another attempt follows and after what delay. Non-2xx statuses,
//! undecodable bodies and GraphQL errors are returned immediately.

mod context;
mod errors;
pub mod graphql;
mod http_client;
mod http_request;
mod http_response;
mod pool;
mod retry;
pub mod subscription;

pub use context::{CallContext, CancellationToken};
pub use errors::{
    BuildError, ClientError, DecodeError, HttpStatusError, PoolExhaustedError, TransportError,
    TransportErrorKind,
};
pub use http_client::{HttpClient, HttpTransport, SDK_VERSION};
pub use http_request::{
    build_request, GraphqlRequest, RequestHead, RequestOption, StaticHeaders, JSON_CONTENT_TYPE,
};
pub use http_response::{unmarshal, unmarshal_value, ResponseCallback, TransportResponse};
pub use pool::{
    ClientPool, DefaultClientPool, PoolLease, RotatingClientPool, RotatingClientPoolBuilder,
};
pub use retry::{RetryDecision, RetryPolicy};

// Re-export GraphQL client types at the clients module level
pub use graphql::{ErrorResponse, GqlError, GqlErrorList, GraphqlClient, GraphqlClientBuilder};
