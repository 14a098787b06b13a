//! # gql-transport
//!
//! A GraphQL transport client: builds correctly-addressed HTTP requests from
//! a query and its variables, classifies responses into data, status errors
//! or GraphQL errors, retries transient network failures against a pool of
//! backends, and multiplexes GraphQL subscriptions over a WebSocket.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - A validated [`EndpointUrl`] newtype for HTTP(S) and WebSocket endpoints
//! - [`GraphqlClient`] with per-call cancellation, deadlines and hooks
//! - Client pools ([`clients::DefaultClientPool`], [`clients::RotatingClientPool`])
//!   that decide which backend each attempt goes to
//! - Bounded, jittered retry of transient network failures via [`RetryPolicy`]
//! - Structured GraphQL errors ([`clients::GqlErrorList`]) kept apart from
//!   network errors
//! - [`SubscriptionClient`] for `graphql-transport-ws` subscriptions
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use gql_transport::{ClientConfig, EndpointUrl, RetryPolicy};
//!
//! let config = ClientConfig::builder()
//!     .endpoint(EndpointUrl::new("https://api.example.com/graphql").unwrap())
//!     .header("Authorization", "Bearer token")
//!     .timeout(Duration::from_secs(30))
//!     .retry_policy(RetryPolicy::default().with_max_attempts(Some(5)))
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making Requests
//!
//! ```rust,ignore
//! use gql_transport::{CallContext, GraphqlClient};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Data {
//!     viewer: Viewer,
//! }
//!
//! #[derive(Deserialize)]
//! struct Viewer {
//!     id: String,
//!     name: String,
//! }
//!
//! let client = GraphqlClient::from_config(&config)?;
//! let data: Data = client
//!     .post(
//!         &CallContext::new(),
//!         "query($id: ID!) { viewer(id: $id) { id name } }",
//!         Some(&json!({ "id": "u1" })),
//!         &[],
//!         &[],
//!     )
//!     .await?;
//! ```
//!
//! ## Subscriptions
//!
//! ```rust,ignore
//! use gql_transport::{EndpointUrl, SubscriptionClient};
//! use gql_transport::clients::subscription::{SubscriptionConfig, SubscriptionSink};
//!
//! let client = SubscriptionClient::new(SubscriptionConfig::new(
//!     EndpointUrl::websocket("wss://api.example.com/graphql")?,
//! ))?;
//!
//! let (sink, mut events) = SubscriptionSink::channel();
//! let id = client
//!     .subscribe("subscription { ticks }", None::<&serde_json::Value>, sink)
//!     .await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Configuration validates on construction
//! - **Thread-safe**: All clients are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **No silent retries**: Only transient network failures are retried, within an explicit policy

pub mod clients;
pub mod config;
pub mod error;

// Re-export public types at crate root for convenience
pub use config::{ClientConfig, ClientConfigBuilder, EndpointUrl};
pub use error::ConfigError;

// Re-export client types
pub use clients::subscription::SubscriptionClient;
pub use clients::{
    CallContext, CancellationToken, ClientError, ClientPool, GraphqlClient, HttpClient,
    HttpTransport, RetryPolicy,
};
