//! End-to-end session tests against a local WebSocket server

use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use oracle_subscriber::config::Config;
use oracle_subscriber::session::{ParseError, SessionConfig, SessionError, SubscriptionSession};
use oracle_subscriber::sink::{ChannelSink, FeedEvent};
use oracle_subscriber::ws::WsError;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerStream = WebSocketStream<TcpStream>;

/// Accept a single WebSocket client and hand it to `handler`
async fn spawn_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        handler(ws).await;
    });

    format!("ws://{}", addr)
}

/// Next text frame, skipping keepalive traffic
async fn next_text(ws: &mut ServerStream) -> String {
    while let Some(msg) = ws.next().await {
        if let Message::Text(text) = msg.unwrap() {
            return text;
        }
    }
    panic!("client closed before sending text");
}

async fn close(mut ws: ServerStream) {
    ws.close(None).await.unwrap();
    while let Some(Ok(_)) = ws.next().await {}
}

fn session_config(url: String) -> SessionConfig {
    reconnecting_session_config(url, 0)
}

fn reconnecting_session_config(url: String, max_reconnects: u32) -> SessionConfig {
    let mut config = Config::default();
    config.feed.ws_url = url;
    config.feed.account = "PriceAccount111".to_string();
    config.transport.max_reconnects = max_reconnects;
    config.transport.initial_delay_ms = 10;
    config.transport.max_delay_ms = 10;
    SessionConfig::from_config(&config)
}

async fn accept(listener: &TcpListener) -> ServerStream {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

/// Read the subscribe request, acknowledge it and return its id
async fn acknowledge(ws: &mut ServerStream, subscription: u64) -> u64 {
    let request: Value = serde_json::from_str(&next_text(ws).await).unwrap();
    let id = request["id"].as_u64().unwrap();
    let ack = json!({"jsonrpc": "2.0", "result": subscription, "id": id});
    ws.send(Message::Text(ack.to_string())).await.unwrap();
    id
}

fn price_account(raw_price: i64) -> Vec<u8> {
    let mut buf = vec![0u8; 96];
    buf[..4].copy_from_slice(&[0xea, 0xa1, 0x0e, 0x24]);
    buf[73..81].copy_from_slice(&raw_price.to_le_bytes());
    buf
}

fn notification(slot: u64, data: &[u8]) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "accountNotification",
        "params": {
            "result": {
                "context": {"slot": slot},
                "value": {
                    "data": [base64::engine::general_purpose::STANDARD.encode(data), "base64"],
                    "executable": false,
                    "lamports": 1_000_000,
                    "owner": "Oracle111",
                    "rentEpoch": 0
                }
            },
            "subscription": 4242
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_subscribe_and_stream_price() {
    let url = spawn_server(|mut ws| async move {
        let request: Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["method"], "accountSubscribe");
        assert_eq!(request["params"][0], "PriceAccount111");
        assert_eq!(request["params"][1]["encoding"], "base64");
        assert_eq!(request["params"][1]["commitment"], "confirmed");

        let ack = json!({"jsonrpc": "2.0", "result": 4242, "id": request["id"]});
        ws.send(Message::Text(ack.to_string())).await.unwrap();

        ws.send(Message::Text(notification(12345, &price_account(10_000_000_000))))
            .await
            .unwrap();
        for slot in 12346..12349 {
            ws.send(Message::Text(notification(slot, &price_account(1))))
                .await
                .unwrap();
        }
        ws.send(Message::Text("this is not json".to_string()))
            .await
            .unwrap();

        close(ws).await;
    })
    .await;

    let (sink, mut events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(session_config(url), sink);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(std::future::pending()),
    )
    .await
    .expect("session timed out");

    // The feed going away is a failure, not a clean finish
    assert!(matches!(
        result,
        Err(SessionError::Transport(WsError::ClosedByPeer))
    ));
    assert!(session.state().is_closed());
    let stats = session.stats();
    assert_eq!(stats.notifications_received, 4);
    assert_eq!(stats.notifications_admitted, 1);
    assert_eq!(stats.notifications_dropped, 3);
    assert_eq!(stats.observations, 1);
    assert_eq!(stats.parse_errors, 1);

    let Some(FeedEvent::Price { slot, observation }) = events.recv().await else {
        panic!("expected price event first");
    };
    assert_eq!(slot, 12345);
    assert_eq!(observation.price, 100.0);
    assert!((observation.confidence - 1.0).abs() < 1e-12);
    let json = serde_json::to_value(&observation).unwrap();
    assert_eq!(json["rawPrice"], "10000000000");
    assert_eq!(json["magic"], "0x240ea1ea");

    assert!(matches!(
        events.recv().await,
        Some(FeedEvent::ParseFailed {
            slot: None,
            error: ParseError::InvalidJson(_)
        })
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_decode_failure_keeps_session_alive() {
    let url = spawn_server(|mut ws| async move {
        let request: Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        let ack = json!({"result": 1, "id": request["id"]});
        ws.send(Message::Text(ack.to_string())).await.unwrap();

        ws.send(Message::Text(notification(1, &[0xde, 0xad, 0xbe, 0xef])))
            .await
            .unwrap();
        close(ws).await;
    })
    .await;

    let (sink, mut events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(session_config(url), sink);
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(std::future::pending()),
    )
    .await
    .expect("session timed out");

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert_eq!(session.stats().decode_errors, 1);
    assert!(matches!(
        events.recv().await,
        Some(FeedEvent::DecodeFailed { slot: 1, .. })
    ));
}

#[tokio::test]
async fn test_shutdown_closes_session() {
    let url = spawn_server(|mut ws| async move {
        let request: Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        let ack = json!({"result": 99, "id": request["id"]});
        ws.send(Message::Text(ack.to_string())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let (sink, _events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(session_config(url), sink);
    let stats = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(tokio::time::sleep(Duration::from_millis(300))),
    )
    .await
    .expect("session timed out")
    .unwrap();

    assert!(session.state().is_closed());
    assert_eq!(stats.notifications_received, 0);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (sink, _events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(session_config(format!("ws://{}", addr)), sink);
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(std::future::pending()),
    )
    .await
    .expect("session timed out");

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert!(session.state().is_closed());
}

#[tokio::test]
async fn test_peer_close_surfaces_after_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        drop(listener);
        acknowledge(&mut ws, 5).await;
        close(ws).await;
    });

    let (sink, _events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(reconnecting_session_config(url, 3), sink);
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(std::future::pending()),
    )
    .await
    .expect("session timed out");

    assert!(matches!(
        result,
        Err(SessionError::Transport(WsError::MaxReconnectsExceeded(3)))
    ));
    assert!(session.state().is_closed());
}

#[tokio::test]
async fn test_reconnect_resubscribes_and_keeps_gate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (ids_tx, mut ids_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        // First connection vanishes without a close frame after one update
        let mut ws = accept(&listener).await;
        ids_tx.send(acknowledge(&mut ws, 10).await).unwrap();
        ws.send(Message::Text(notification(1, &price_account(10_000_000_000))))
            .await
            .unwrap();
        drop(ws);

        // Same again; the update lands inside the gate interval
        let mut ws = accept(&listener).await;
        ids_tx.send(acknowledge(&mut ws, 11).await).unwrap();
        ws.send(Message::Text(notification(2, &price_account(1))))
            .await
            .unwrap();
        drop(ws);

        // A single allowed retry still covers this drop since the budget
        // restarts after every handshake
        let mut ws = accept(&listener).await;
        ids_tx.send(acknowledge(&mut ws, 12).await).unwrap();
        ws.send(Message::Text("not json".to_string())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (sink, mut events) = ChannelSink::channel(16);
    let mut session = SubscriptionSession::new(reconnecting_session_config(url, 1), sink);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let watcher = async move {
        let first = events.recv().await;
        let second = events.recv().await;
        let _ = stop_tx.send(());
        (first, second)
    };
    let shutdown = async move {
        let _ = stop_rx.await;
    };

    let (result, (first, second)) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(session.run(shutdown), watcher)
    })
    .await
    .expect("session timed out");

    let stats = result.unwrap();
    assert!(matches!(first, Some(FeedEvent::Price { slot: 1, .. })));
    assert!(matches!(
        second,
        Some(FeedEvent::ParseFailed {
            error: ParseError::InvalidJson(_),
            ..
        })
    ));
    assert_eq!(stats.notifications_received, 2);
    assert_eq!(stats.notifications_admitted, 1);
    assert_eq!(stats.notifications_dropped, 1);
    assert_eq!(stats.parse_errors, 1);

    let mut ids = Vec::new();
    while let Ok(id) = ids_rx.try_recv() {
        ids.push(id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
}
