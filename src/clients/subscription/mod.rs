//! GraphQL subscriptions over WebSocket.
//!
//! This module provides [`SubscriptionClient`], which multiplexes any number
//! of subscriptions over a single `graphql-transport-ws` connection.
//!
//! # Overview
//!
//! - [`SubscriptionClient`]: subscribe, unsubscribe and close
//! - [`SubscriptionConfig`]: endpoint, handshake headers, init payload, timeouts
//! - [`SubscriptionSink`]: where events go (a channel or a callback)
//! - [`SubscriptionEvent`]: `Data`, `Error` or `Complete`
//! - [`SubscriptionError`]: connect, handshake, connection-closed and GraphQL errors
//! - [`UnsubscribeBehavior`]: whether unsubscribing also closes the connection
//!
//! # Lifecycle
//!
//! The connection opens lazily on the first `subscribe`. A single receive
//! task dispatches `next`, `error` and `complete` frames to the sink
//! registered under the frame's ID; frames for unknown IDs are dropped. When
//! the connection is lost every sink receives
//! [`SubscriptionError::ConnectionClosed`] and the client reconnects on the
//! next `subscribe`.

mod client;
mod config;
mod errors;
mod protocol;
mod sink;

pub use client::SubscriptionClient;
pub use config::{SubscriptionConfig, UnsubscribeBehavior};
pub use errors::SubscriptionError;
pub use sink::{SubscriptionEvent, SubscriptionSink};
