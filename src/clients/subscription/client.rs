//! Multiplexed GraphQL subscriptions over one WebSocket connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::config::{SubscriptionConfig, UnsubscribeBehavior};
use super::errors::SubscriptionError;
use super::protocol::{error_list, Frame, SUBPROTOCOL};
use super::sink::{SubscriptionEvent, SubscriptionSink};
use crate::clients::context::CancellationToken;
use crate::clients::http_request::GraphqlRequest;
use crate::error::ConfigError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

#[derive(Debug, Default)]
struct Registry {
    sinks: HashMap<String, SubscriptionSink>,
    closed: bool,
}

type SharedRegistry = Arc<Mutex<Registry>>;

/// A live connection: its outgoing frame queue, registry and shutdown token.
#[derive(Debug)]
struct Connection {
    frames: mpsc::UnboundedSender<Frame>,
    registry: SharedRegistry,
    shutdown: CancellationToken,
}

impl Connection {
    fn is_alive(&self) -> bool {
        !self.shutdown.is_cancelled()
    }
}

/// GraphQL subscription client over the `graphql-transport-ws` protocol.
///
/// All subscriptions share one WebSocket connection, opened by the first
/// [`subscribe`](Self::subscribe) and served by a single receive task that
/// dispatches frames to sinks by subscription ID. If the connection drops,
/// every active sink receives [`SubscriptionError::ConnectionClosed`]; there
/// is no automatic reconnect, and the next `subscribe` opens a fresh
/// connection.
///
/// # Example
///
/// ```rust,ignore
/// use gql_transport::clients::subscription::{
///     SubscriptionClient, SubscriptionConfig, SubscriptionEvent, SubscriptionSink,
/// };
/// use gql_transport::EndpointUrl;
///
/// let config = SubscriptionConfig::new(EndpointUrl::websocket("wss://api.example.com/graphql")?);
/// let client = SubscriptionClient::new(config)?;
///
/// let (sink, mut events) = SubscriptionSink::channel();
/// let id = client
///     .subscribe("subscription { ticks }", None::<&serde_json::Value>, sink)
///     .await?;
///
/// while let Some(event) = events.recv().await {
///     match event {
///         SubscriptionEvent::Data(payload) => println!("{payload}"),
///         SubscriptionEvent::Error(error) => eprintln!("{error}"),
///         SubscriptionEvent::Complete => break,
///     }
/// }
///
/// client.unsubscribe(&id).await;
/// ```
#[derive(Debug)]
pub struct SubscriptionClient {
    config: SubscriptionConfig,
    headers: Vec<(HeaderName, HeaderValue)>,
    connection: tokio::sync::Mutex<Option<Connection>>,
    next_id: AtomicU64,
}

// Verify SubscriptionClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SubscriptionClient>();
};

impl SubscriptionClient {
    /// Creates a client. No connection is opened until the first subscribe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedScheme`] if the endpoint is not a
    /// `ws`/`wss` URL and [`ConfigError::InvalidHeader`] if a handshake
    /// header is invalid.
    pub fn new(config: SubscriptionConfig) -> Result<Self, ConfigError> {
        if !config.endpoint().is_websocket() {
            return Err(ConfigError::UnsupportedScheme {
                url: config.endpoint().to_string(),
                expected: "ws, wss",
            });
        }

        let headers = config
            .headers()
            .iter()
            .map(|(name, value)| {
                let invalid = |reason: String| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason,
                };
                let header_name =
                    HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
                let header_value =
                    HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
                Ok((header_name, header_value))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            config,
            headers,
            connection: tokio::sync::Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Starts a subscription and returns its ID.
    ///
    /// Connects (and performs the `connection_init` handshake) if no live
    /// connection exists. The sink is registered before the `subscribe`
    /// frame is sent, so no event can be missed.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Encode`] if the request is invalid,
    /// [`SubscriptionError::Connect`] or [`SubscriptionError::Handshake`] if
    /// connecting fails, and [`SubscriptionError::ConnectionClosed`] if the
    /// connection closed while subscribing.
    pub async fn subscribe<V>(
        &self,
        query: &str,
        variables: Option<&V>,
        sink: SubscriptionSink,
    ) -> Result<String, SubscriptionError>
    where
        V: Serialize + ?Sized,
    {
        let request = GraphqlRequest::new(query, variables)
            .map_err(|e| SubscriptionError::Encode(e.to_string()))?;

        let mut guard = self.connection.lock().await;
        if !guard.as_ref().is_some_and(Connection::is_alive) {
            *guard = Some(self.connect().await?);
        }
        let Some(connection) = guard.as_ref() else {
            return Err(SubscriptionError::ConnectionClosed {
                reason: "no connection".to_string(),
            });
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        {
            let mut registry = connection.registry.lock();
            if registry.closed {
                return Err(SubscriptionError::ConnectionClosed {
                    reason: "connection closed while subscribing".to_string(),
                });
            }
            registry.sinks.insert(id.clone(), sink);
        }

        let frame = Frame::Subscribe {
            id: id.clone(),
            payload: request,
        };
        if connection.frames.send(frame).is_err() {
            connection.registry.lock().sinks.remove(&id);
            return Err(SubscriptionError::ConnectionClosed {
                reason: "writer stopped".to_string(),
            });
        }

        tracing::debug!(%id, "subscribed");
        Ok(id)
    }

    /// Stops a subscription.
    ///
    /// Sends `complete` for the ID and removes its sink; once this returns,
    /// no further event reaches that sink. Under
    /// [`UnsubscribeBehavior::CloseConnection`] the shared connection is
    /// closed as well. Returns `false` if the ID was not active.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let mut guard = self.connection.lock().await;
        let Some(connection) = guard.as_ref() else {
            return false;
        };

        let removed = connection.registry.lock().sinks.remove(id).is_some();
        if removed {
            let _ = connection.frames.send(Frame::Complete { id: id.to_string() });
            tracing::debug!(%id, "unsubscribed");
        } else {
            tracing::debug!(%id, "unsubscribe for unknown subscription");
        }

        if self.config.unsubscribe_behavior() == UnsubscribeBehavior::CloseConnection {
            if let Some(connection) = guard.take() {
                connection.shutdown.cancel();
            }
        }

        removed
    }

    /// Closes the connection. Active sinks receive
    /// [`SubscriptionError::ConnectionClosed`].
    pub async fn close(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.shutdown.cancel();
        }
    }

    /// Returns `true` if a live connection is open.
    pub async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(Connection::is_alive)
    }

    /// Returns the number of active subscriptions on the current connection.
    pub async fn active_subscriptions(&self) -> usize {
        self.connection
            .lock()
            .await
            .as_ref()
            .map_or(0, |connection| connection.registry.lock().sinks.len())
    }

    async fn connect(&self) -> Result<Connection, SubscriptionError> {
        let endpoint = self.config.endpoint();
        let mut request = endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SubscriptionError::Connect(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        tracing::debug!(%endpoint, "opening subscription connection");
        let (stream, _response) = tokio::time::timeout(
            self.config.connect_timeout(),
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| SubscriptionError::Connect("timed out".to_string()))?
        .map_err(|e| SubscriptionError::Connect(e.to_string()))?;

        let (mut writer, mut reader) = stream.split();

        let init = Frame::ConnectionInit {
            payload: self.config.init_payload().cloned(),
        };
        send_frame(&mut writer, &init)
            .await
            .map_err(SubscriptionError::Handshake)?;

        let ack = await_ack(&mut reader, &mut writer);
        tokio::time::timeout(self.config.ack_timeout(), ack)
            .await
            .map_err(|_| {
                SubscriptionError::Handshake("timed out waiting for connection_ack".to_string())
            })??;
        tracing::debug!(%endpoint, "connection acknowledged");

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let registry: SharedRegistry = Arc::new(Mutex::new(Registry::default()));
        let shutdown = CancellationToken::new();

        tokio::spawn(write_loop(
            writer,
            frames_rx,
            shutdown.clone(),
            self.config.keep_alive_interval(),
        ));
        tokio::spawn(read_loop(
            reader,
            Arc::clone(&registry),
            frames_tx.clone(),
            shutdown.clone(),
        ));

        Ok(Connection {
            frames: frames_tx,
            registry,
            shutdown,
        })
    }
}

impl Drop for SubscriptionClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.shutdown.cancel();
        }
    }
}

async fn send_frame(writer: &mut WsWriter, frame: &Frame) -> Result<(), String> {
    let text = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    writer
        .send(Message::text(text))
        .await
        .map_err(|e| e.to_string())
}

async fn await_ack(
    reader: &mut WsReader,
    writer: &mut WsWriter,
) -> Result<(), SubscriptionError> {
    loop {
        let text = match reader.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return Err(SubscriptionError::Handshake(
                    "connection closed before connection_ack".to_string(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(SubscriptionError::Handshake(e.to_string())),
        };

        match serde_json::from_str::<Frame>(text.as_str()) {
            Ok(Frame::ConnectionAck { .. }) => return Ok(()),
            Ok(Frame::Ping { payload }) => {
                send_frame(writer, &Frame::Pong { payload })
                    .await
                    .map_err(SubscriptionError::Handshake)?;
            }
            Ok(Frame::Pong { .. }) => {}
            Ok(other) => {
                return Err(SubscriptionError::Handshake(format!(
                    "expected connection_ack, got {}",
                    other.kind()
                )));
            }
            Err(e) => return Err(SubscriptionError::Protocol(e.to_string())),
        }
    }
}

async fn tick(keep_alive: &mut Option<tokio::time::Interval>) {
    match keep_alive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn write_loop(
    mut writer: WsWriter,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    shutdown: CancellationToken,
    keep_alive: Option<Duration>,
) {
    let mut keep_alive = keep_alive
        .filter(|period| !period.is_zero())
        .map(|period| tokio::time::interval_at(tokio::time::Instant::now() + period, period));

    loop {
        // Queued frames are flushed before shutdown is honored.
        let frame = tokio::select! {
            biased;
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            () = shutdown.cancelled() => break,
            () = tick(&mut keep_alive) => Frame::Ping { payload: None },
        };

        if let Err(error) = send_frame(&mut writer, &frame).await {
            tracing::warn!(%error, kind = frame.kind(), "failed to send subscription frame");
            shutdown.cancel();
            break;
        }
    }

    let _ = writer.close().await;
}

async fn read_loop(
    mut reader: WsReader,
    registry: SharedRegistry,
    frames: mpsc::UnboundedSender<Frame>,
    shutdown: CancellationToken,
) {
    let reason = loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => break "connection closed by client".to_string(),
            message = reader.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &registry, &frames),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => dispatch(text, &registry, &frames),
                Err(error) => tracing::debug!(%error, "ignoring non-UTF-8 binary frame"),
            },
            Some(Ok(Message::Close(close))) => {
                break close.map_or_else(
                    || "connection closed by server".to_string(),
                    |close| format!("{} {}", close.code, close.reason.as_str()),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => break error.to_string(),
            None => break "connection closed by server".to_string(),
        }
    };

    shutdown.cancel();

    let mut registry = registry.lock();
    registry.closed = true;
    if !registry.sinks.is_empty() {
        tracing::warn!(
            %reason,
            subscriptions = registry.sinks.len(),
            "subscription connection lost"
        );
    }
    for (_, sink) in registry.sinks.drain() {
        sink.deliver(SubscriptionEvent::Error(
            SubscriptionError::ConnectionClosed {
                reason: reason.clone(),
            },
        ));
    }
}

fn dispatch(text: &str, registry: &SharedRegistry, frames: &mpsc::UnboundedSender<Frame>) {
    let frame = match serde_json::from_str::<Frame>(text) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::debug!(%error, "ignoring unrecognized subscription frame");
            return;
        }
    };

    match frame {
        Frame::Next { id, payload } => {
            let mut registry = registry.lock();
            let delivered = registry
                .sinks
                .get(&id)
                .map(|sink| sink.deliver(SubscriptionEvent::Data(payload)));
            match delivered {
                Some(true) => {}
                Some(false) => {
                    // Receiver dropped: stop the subscription server-side.
                    registry.sinks.remove(&id);
                    let _ = frames.send(Frame::Complete { id });
                }
                None => tracing::debug!(%id, "dropping next frame for unknown subscription"),
            }
        }
        Frame::Error { id, payload } => {
            let error = error_list(payload).map_or_else(
                |e| SubscriptionError::Protocol(e.to_string()),
                SubscriptionError::Graphql,
            );
            let mut registry = registry.lock();
            match registry.sinks.remove(&id) {
                Some(sink) => {
                    sink.deliver(SubscriptionEvent::Error(error));
                }
                None => tracing::debug!(%id, "dropping error frame for unknown subscription"),
            }
        }
        Frame::Complete { id } => {
            let mut registry = registry.lock();
            match registry.sinks.remove(&id) {
                Some(sink) => {
                    sink.deliver(SubscriptionEvent::Complete);
                }
                None => tracing::debug!(%id, "dropping complete frame for unknown subscription"),
            }
        }
        Frame::Ping { payload } => {
            let _ = frames.send(Frame::Pong { payload });
        }
        Frame::Pong { .. } | Frame::ConnectionAck { .. } => {}
        Frame::ConnectionInit { .. } | Frame::Subscribe { .. } => {
            tracing::debug!(kind = frame.kind(), "ignoring client-only frame from server");
        }
    }
}
