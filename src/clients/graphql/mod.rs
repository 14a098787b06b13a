//! GraphQL client over HTTP.
//!
//! This module provides the [`GraphqlClient`], which executes GraphQL
//! operations against the backends of a [`ClientPool`](crate::clients::ClientPool),
//! and the structured GraphQL error types it returns.
//!
//! # Overview
//!
//! - [`GraphqlClient`]: `post`, `query` and `post_request`
//! - [`GraphqlClientBuilder`]: a client over a custom pool, with instance hooks
//! - [`GqlError`] / [`GqlErrorList`]: errors reported in a 2xx response body
//! - [`ErrorResponse`]: a failed call projected into its network or GraphQL half
//!
//! # Outcomes
//!
//! A call ends in exactly one of:
//!
//! - typed `data` (HTTP 2xx, no `errors`)
//! - [`ClientError::HttpStatus`](crate::clients::ClientError::HttpStatus) (non-2xx, never retried)
//! - [`ClientError::Graphql`](crate::clients::ClientError::Graphql) (2xx with `errors`)
//! - a build, decode, transport, pool or interruption error
//!
//! Transient network failures are retried against the pool according to the
//! client's [`RetryPolicy`](crate::clients::RetryPolicy).
//!
//! # Example
//!
//! ```rust,ignore
//! use gql_transport::clients::{CallContext, ClientError, GraphqlClient};
//! use serde_json::Value;
//!
//! let client = GraphqlClient::from_config(&config)?;
//! match client.query::<Value>(&CallContext::new(), "{ viewer { id } }").await {
//!     Ok(data) => println!("{data}"),
//!     Err(ClientError::Graphql(errors)) => println!("GraphQL errors: {errors}"),
//!     Err(e) => println!("request failed: {e}"),
//! }
//! ```

mod client;
mod errors;

pub use client::{GraphqlClient, GraphqlClientBuilder};
pub use errors::{ErrorResponse, GqlError, GqlErrorList, GqlErrorLocation, GqlPathSegment};
