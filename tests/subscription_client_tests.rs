//! Integration tests for GraphQL subscriptions over WebSocket.
//!
//! Each test runs a scripted `graphql-transport-ws` server on a local port
//! and verifies the handshake, event dispatch by subscription ID,
//! unsubscribe semantics and connection loss.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gql_transport::clients::subscription::{
    SubscriptionClient, SubscriptionConfig, SubscriptionError, SubscriptionEvent,
    SubscriptionSink, UnsubscribeBehavior,
};
use gql_transport::EndpointUrl;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

type ServerSocket = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

/// Accepts a single WebSocket connection and hands it to `handler` along
/// with the handshake request headers.
async fn serve<F, Fut>(handler: F) -> (EndpointUrl, JoinHandle<()>)
where
    F: FnOnce(ServerSocket, HeaderMap) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(listener);

        let mut headers = HeaderMap::new();
        let ws = accept_hdr_async(
            stream,
            |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
                headers = request.headers().clone();
                response.headers_mut().insert(
                    SEC_WEBSOCKET_PROTOCOL,
                    HeaderValue::from_static("graphql-transport-ws"),
                );
                Ok(response)
            },
        )
        .await
        .unwrap();

        handler(ws, headers).await;
    });

    let endpoint = EndpointUrl::websocket(format!("ws://{addr}/graphql")).unwrap();
    (endpoint, task)
}

/// Reads the next protocol frame, or `None` once the client has closed.
async fn next_frame(ws: &mut ServerSocket) -> Option<Value> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

async fn expect_frame(ws: &mut ServerSocket, kind: &str) -> Value {
    let frame = next_frame(ws).await.expect("client closed the connection");
    assert_eq!(frame["type"], kind, "unexpected frame {frame}");
    frame
}

async fn send(ws: &mut ServerSocket, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

/// Completes the `connection_init`/`connection_ack` exchange and returns
/// the init frame.
async fn handshake(ws: &mut ServerSocket) -> Value {
    let init = expect_frame(ws, "connection_init").await;
    send(ws, json!({ "type": "connection_ack" })).await;
    init
}

fn next_tick(id: &Value, tick: u32) -> Value {
    json!({ "type": "next", "id": id, "payload": { "data": { "tick": tick } } })
}

/// Keeps the connection open until the client goes away.
async fn hold(mut ws: ServerSocket) {
    while next_frame(&mut ws).await.is_some() {}
}

async fn recv_event(events: &mut mpsc::UnboundedReceiver<SubscriptionEvent>) -> SubscriptionEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("sink closed")
}

async fn finish(task: JoinHandle<()>) {
    tokio::time::timeout(WAIT, task)
        .await
        .expect("server did not finish")
        .unwrap();
}

fn client(endpoint: EndpointUrl) -> SubscriptionClient {
    SubscriptionClient::new(SubscriptionConfig::new(endpoint)).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct TickData {
    tick: u32,
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_sends_headers_subprotocol_and_init_payload() {
    let (endpoint, server) = serve(|mut ws, headers| async move {
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers[SEC_WEBSOCKET_PROTOCOL], "graphql-transport-ws");

        let init = handshake(&mut ws).await;
        assert_eq!(init["payload"], json!({ "token": "abc" }));

        let subscribe = expect_frame(&mut ws, "subscribe").await;
        assert_eq!(subscribe["id"], "1");
        assert_eq!(
            subscribe["payload"],
            json!({ "query": "subscription($n: Int) { tick(n: $n) }", "variables": { "n": 2 } })
        );
        hold(ws).await;
    })
    .await;

    let config = SubscriptionConfig::new(endpoint)
        .with_header("Authorization", "Bearer abc")
        .with_init_payload(json!({ "token": "abc" }));
    let client = SubscriptionClient::new(config).unwrap();

    let (sink, _events) = SubscriptionSink::channel();
    let id = client
        .subscribe(
            "subscription($n: Int) { tick(n: $n) }",
            Some(&json!({ "n": 2 })),
            sink,
        )
        .await
        .unwrap();

    assert_eq!(id, "1");
    assert!(client.is_connected().await);

    client.close().await;
    finish(server).await;
}

#[tokio::test]
async fn test_missing_ack_is_a_handshake_error() {
    let (endpoint, _server) = serve(|mut ws, _| async move {
        expect_frame(&mut ws, "connection_init").await;
        tokio::time::sleep(WAIT).await;
    })
    .await;

    let config = SubscriptionConfig::new(endpoint).with_ack_timeout(Duration::from_millis(100));
    let client = SubscriptionClient::new(config).unwrap();

    let (sink, _events) = SubscriptionSink::channel();
    let error = client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap_err();

    assert!(matches!(error, SubscriptionError::Handshake(_)));
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_ping_before_ack_is_answered_with_pong() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        expect_frame(&mut ws, "connection_init").await;
        send(&mut ws, json!({ "type": "ping", "payload": { "seq": 0 } })).await;

        let pong = expect_frame(&mut ws, "pong").await;
        assert_eq!(pong["payload"], json!({ "seq": 0 }));

        send(&mut ws, json!({ "type": "connection_ack" })).await;
        expect_frame(&mut ws, "subscribe").await;
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, _events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    client.close().await;
    finish(server).await;
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(EndpointUrl::websocket(format!("ws://{addr}/graphql")).unwrap());
    let (sink, _events) = SubscriptionSink::channel();
    let error = client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap_err();

    assert!(matches!(error, SubscriptionError::Connect(_)));
}

// ============================================================================
// Event Dispatch
// ============================================================================

#[tokio::test]
async fn test_next_and_complete_are_delivered() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let subscribe = expect_frame(&mut ws, "subscribe").await;
        let id = subscribe["id"].clone();

        send(&mut ws, next_tick(&id, 1)).await;
        send(&mut ws, next_tick(&id, 2)).await;
        send(&mut ws, json!({ "type": "complete", "id": id })).await;
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, mut events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    let first = recv_event(&mut events).await;
    assert_eq!(first.decode::<TickData>().unwrap().unwrap(), TickData { tick: 1 });
    let second = recv_event(&mut events).await;
    assert_eq!(second.decode::<TickData>().unwrap().unwrap(), TickData { tick: 2 });

    let last = recv_event(&mut events).await;
    assert_eq!(last, SubscriptionEvent::Complete);
    assert!(last.is_terminal());
    assert_eq!(client.active_subscriptions().await, 0);

    client.close().await;
    finish(server).await;
}

#[tokio::test]
async fn test_subscriptions_share_one_connection() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let first = expect_frame(&mut ws, "subscribe").await;
        let second = expect_frame(&mut ws, "subscribe").await;

        send(&mut ws, next_tick(&second["id"], 20)).await;
        send(&mut ws, next_tick(&first["id"], 10)).await;
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (first_sink, mut first_events) = SubscriptionSink::channel();
    let (second_sink, mut second_events) = SubscriptionSink::channel();

    let first_id = client
        .subscribe("subscription { tick }", None::<&Value>, first_sink)
        .await
        .unwrap();
    let second_id = client
        .subscribe("subscription { tick }", None::<&Value>, second_sink)
        .await
        .unwrap();

    assert_ne!(first_id, second_id);
    assert_eq!(client.active_subscriptions().await, 2);

    let event = recv_event(&mut second_events).await;
    assert_eq!(event, SubscriptionEvent::Data(json!({ "data": { "tick": 20 } })));
    let event = recv_event(&mut first_events).await;
    assert_eq!(event, SubscriptionEvent::Data(json!({ "data": { "tick": 10 } })));

    client.close().await;
    finish(server).await;
}

#[tokio::test]
async fn test_error_frame_ends_subscription_with_graphql_errors() {
    let (endpoint, _server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let subscribe = expect_frame(&mut ws, "subscribe").await;
        send(
            &mut ws,
            json!({
                "type": "error",
                "id": subscribe["id"],
                "payload": [{ "message": "unknown field 'tock'" }]
            }),
        )
        .await;
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, mut events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tock }", None::<&Value>, sink)
        .await
        .unwrap();

    match recv_event(&mut events).await {
        SubscriptionEvent::Error(SubscriptionError::Graphql(errors)) => {
            assert_eq!(
                errors.messages().collect::<Vec<_>>(),
                vec!["unknown field 'tock'"]
            );
        }
        other => panic!("expected GraphQL errors, got {other:?}"),
    }
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn test_callback_sink_receives_events() {
    let (endpoint, _server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let subscribe = expect_frame(&mut ws, "subscribe").await;
        send(&mut ws, next_tick(&subscribe["id"], 7)).await;
        hold(ws).await;
    })
    .await;

    let (tx, mut received) = mpsc::unbounded_channel();
    let sink = SubscriptionSink::callback(move |event| {
        let _ = tx.send(event);
    });

    let client = client(endpoint);
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    let event = recv_event(&mut received).await;
    assert_eq!(event.decode::<TickData>().unwrap().unwrap().tick, 7);
}

#[tokio::test]
async fn test_server_ping_is_answered_with_pong() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        expect_frame(&mut ws, "subscribe").await;
        send(&mut ws, json!({ "type": "ping", "payload": { "seq": 1 } })).await;

        let pong = expect_frame(&mut ws, "pong").await;
        assert_eq!(pong["payload"], json!({ "seq": 1 }));
    })
    .await;

    let client = client(endpoint);
    let (sink, _events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    finish(server).await;
}

// ============================================================================
// Unsubscribe and Connection Loss
// ============================================================================

#[tokio::test]
async fn test_unsubscribe_sends_complete_and_stops_delivery() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let subscribe = expect_frame(&mut ws, "subscribe").await;

        let complete = expect_frame(&mut ws, "complete").await;
        assert_eq!(complete["id"], subscribe["id"]);

        // Late events for the stopped subscription are dropped by the client.
        send(&mut ws, next_tick(&subscribe["id"], 1)).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, mut events) = SubscriptionSink::channel();
    let id = client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    assert!(client.unsubscribe(&id).await);
    assert!(!client.unsubscribe(&id).await);
    assert!(events.recv().await.is_none());

    finish(server).await;
    assert_eq!(client.active_subscriptions().await, 0);
}

#[tokio::test]
async fn test_unsubscribe_can_close_the_connection() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        expect_frame(&mut ws, "subscribe").await;
        expect_frame(&mut ws, "complete").await;
        assert!(next_frame(&mut ws).await.is_none());
    })
    .await;

    let config = SubscriptionConfig::new(endpoint)
        .with_unsubscribe_behavior(UnsubscribeBehavior::CloseConnection);
    let client = SubscriptionClient::new(config).unwrap();

    let (sink, _events) = SubscriptionSink::channel();
    let id = client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    assert!(client.unsubscribe(&id).await);
    assert!(!client.is_connected().await);
    finish(server).await;
}

#[tokio::test]
async fn test_dropped_receiver_completes_subscription_server_side() {
    let (endpoint, server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        let subscribe = expect_frame(&mut ws, "subscribe").await;
        send(&mut ws, next_tick(&subscribe["id"], 1)).await;

        let complete = expect_frame(&mut ws, "complete").await;
        assert_eq!(complete["id"], subscribe["id"]);
    })
    .await;

    let client = client(endpoint);
    let (sink, events) = SubscriptionSink::channel();
    drop(events);
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    finish(server).await;
}

#[tokio::test]
async fn test_server_close_delivers_connection_closed() {
    let (endpoint, _server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        expect_frame(&mut ws, "subscribe").await;
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        }))
        .await
        .unwrap();
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, mut events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    match recv_event(&mut events).await {
        SubscriptionEvent::Error(SubscriptionError::ConnectionClosed { reason }) => {
            assert!(reason.contains("bye"), "unexpected reason {reason}");
        }
        other => panic!("expected connection closed, got {other:?}"),
    }
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_close_notifies_active_sinks() {
    let (endpoint, _server) = serve(|mut ws, _| async move {
        handshake(&mut ws).await;
        expect_frame(&mut ws, "subscribe").await;
        hold(ws).await;
    })
    .await;

    let client = client(endpoint);
    let (sink, mut events) = SubscriptionSink::channel();
    client
        .subscribe("subscription { tick }", None::<&Value>, sink)
        .await
        .unwrap();

    client.close().await;

    let event = recv_event(&mut events).await;
    assert!(matches!(
        event,
        SubscriptionEvent::Error(SubscriptionError::ConnectionClosed { .. })
    ));
    assert!(!client.is_connected().await);
}
