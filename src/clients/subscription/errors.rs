//! Subscription error types.

use thiserror::Error;

use crate::clients::graphql::GqlErrorList;

/// Errors produced by the subscription client, either returned from
/// `subscribe` or delivered to a sink as
/// [`SubscriptionEvent::Error`](super::SubscriptionEvent::Error).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SubscriptionError {
    /// The WebSocket connection could not be established.
    #[error("websocket connect failed: {0}")]
    Connect(String),

    /// The `connection_init`/`connection_ack` handshake failed.
    #[error("connection handshake failed: {0}")]
    Handshake(String),

    /// The connection closed while the subscription was active.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Why the connection closed.
        reason: String,
    },

    /// The server ended the subscription with GraphQL errors.
    #[error("{0}")]
    Graphql(GqlErrorList),

    /// The subscription request could not be encoded.
    #[error("encode: {0}")]
    Encode(String),

    /// The server sent a frame that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}
