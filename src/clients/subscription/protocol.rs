//! `graphql-transport-ws` frames.
//!
//! See <https://github.com/enisdenjo/graphql-ws/blob/master/PROTOCOL.md>.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::graphql::{GqlError, GqlErrorList};
use crate::clients::http_request::GraphqlRequest;

/// WebSocket subprotocol name.
pub(crate) const SUBPROTOCOL: &str = "graphql-transport-ws";

/// A protocol frame, tagged by its `type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Frame {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Subscribe {
        id: String,
        payload: GraphqlRequest,
    },
    Next {
        id: String,
        payload: Value,
    },
    Error {
        id: String,
        payload: Value,
    },
    Complete {
        id: String,
    },
}

impl Frame {
    /// The frame's `type` tag.
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionInit { .. } => "connection_init",
            Self::ConnectionAck { .. } => "connection_ack",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Subscribe { .. } => "subscribe",
            Self::Next { .. } => "next",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}

/// Parses an `error` frame payload: an array of errors, or a single error
/// object from servers that do not wrap it.
pub(crate) fn error_list(payload: Value) -> Result<GqlErrorList, serde_json::Error> {
    let errors = if payload.is_array() {
        serde_json::from_value::<Vec<GqlError>>(payload)?
    } else {
        vec![serde_json::from_value::<GqlError>(payload)?]
    };
    Ok(GqlErrorList::new(errors))
}
