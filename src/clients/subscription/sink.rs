//! Subscription events and the sinks they are delivered to.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use super::errors::SubscriptionError;
use crate::clients::errors::ClientError;
use crate::clients::http_response::unmarshal_value;

/// An event delivered to a subscription's sink.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionEvent {
    /// A `next` payload: a GraphQL response (`{"data": .., "errors": ..}`).
    Data(Value),
    /// The subscription failed. No further events follow.
    Error(SubscriptionError),
    /// The server completed the subscription. No further events follow.
    Complete,
}

impl SubscriptionEvent {
    /// Decodes a [`Data`](Self::Data) payload into `T` using the same rules
    /// as an HTTP response body. Returns `None` for other events.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T, ClientError>> {
        match self {
            Self::Data(payload) => Some(unmarshal_value(payload.clone())),
            _ => None,
        }
    }

    /// Returns `true` if no further events follow this one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}

/// Where a subscription's events are delivered.
///
/// Delivery happens on the connection's receive task, in frame order.
///
/// # Example
///
/// ```rust
/// use gql_transport::clients::subscription::{SubscriptionEvent, SubscriptionSink};
///
/// let (sink, mut events) = SubscriptionSink::channel();
/// let logger = SubscriptionSink::callback(|event: SubscriptionEvent| {
///     println!("{event:?}");
/// });
/// # let _ = (sink, logger, events.try_recv());
/// ```
#[derive(Clone)]
pub enum SubscriptionSink {
    /// Events are sent to an unbounded channel.
    Channel(mpsc::UnboundedSender<SubscriptionEvent>),
    /// Events are passed to a callback. The callback runs on the receive
    /// task and must not block.
    Callback(Arc<dyn Fn(SubscriptionEvent) + Send + Sync>),
}

impl SubscriptionSink {
    /// Creates a channel sink and its receiving half.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubscriptionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Channel(tx), rx)
    }

    /// Creates a callback sink.
    #[must_use]
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(SubscriptionEvent) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(callback))
    }

    /// Delivers an event. Returns `false` if the receiving half of a channel
    /// sink has been dropped.
    pub(crate) fn deliver(&self, event: SubscriptionEvent) -> bool {
        match self {
            Self::Channel(tx) => tx.send(event).is_ok(),
            Self::Callback(callback) => {
                callback(event);
                true
            }
        }
    }
}

impl fmt::Debug for SubscriptionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(_) => f.write_str("SubscriptionSink::Channel"),
            Self::Callback(_) => f.write_str("SubscriptionSink::Callback"),
        }
    }
}
