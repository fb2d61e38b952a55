//! WebSocket integration tests against an in-process tungstenite server on
//! the loopback interface.
//!
//! Run with: cargo test -p twin-link --test test_websocket_integration -- --nocapture

mod common;

use common::init_logger;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tokio::{net::TcpListener, sync::mpsc, sync::watch, time::timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use twin_link::{ChannelOptions, ChannelState, EventHandlers, ReconnectingChannel};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn text(value: JsonValue) -> Message {
    Message::Text(value.to_string().into())
}

async fn wait_for_state(rx: &mut watch::Receiver<ChannelState>, target: ChannelState) {
    timeout(TEST_TIMEOUT, rx.wait_for(|state| *state == target))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", target))
        .expect("state sender dropped");
}

async fn next_message(rx: &mut mpsc::UnboundedReceiver<JsonValue>) -> JsonValue {
    timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("message stream ended")
}

#[tokio::test]
async fn test_round_trip_reconnect_and_close() {
    init_logger();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: greet, confirm one subscription, then vanish.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(text(json!({"type": "connection", "message": "Connected to sensor updates"})))
            .await
            .unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(raw) = msg {
                let request: JsonValue = serde_json::from_str(raw.as_str()).unwrap();
                if request["type"] == "subscribe_sensor" {
                    ws.send(text(json!({"type": "subscribed", "sensor_id": request["sensor_id"]})))
                        .await
                        .unwrap();
                    break;
                }
            }
        }
        drop(ws);

        // Second connection: wait for the client's close frame.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    });

    let (tx, mut messages) = mpsc::unbounded_channel();
    let channel = ReconnectingChannel::builder()
        .endpoint(format!("http://{}/ws/sensors/", addr))
        .options(
            ChannelOptions::default()
                .with_reconnect_delay_ms(200)
                .with_connection_timeout_ms(5_000),
        )
        .event_handlers(EventHandlers::new().on_message(move |m| {
            let _ = tx.send(m);
        }))
        .build()
        .unwrap();
    let mut states = channel.watch_state();

    channel.connect().unwrap();
    wait_for_state(&mut states, ChannelState::Connected).await;
    assert_eq!(next_message(&mut messages).await["type"], "connection");

    assert!(channel.send(&json!({"type": "subscribe_sensor", "sensor_id": 4})));
    assert_eq!(
        next_message(&mut messages).await,
        json!({"type": "subscribed", "sensor_id": 4})
    );

    // Server vanished: the channel comes back on its own.
    wait_for_state(&mut states, ChannelState::Reconnecting).await;
    wait_for_state(&mut states, ChannelState::Connected).await;
    assert_eq!(channel.attempt(), 0);

    channel.close();
    let close_code = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(close_code, Some(1000));
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[tokio::test]
async fn test_refused_connection_gives_up() {
    init_logger();
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let (tx, mut errors) = mpsc::unbounded_channel();
    let channel = ReconnectingChannel::builder()
        .endpoint(format!("ws://{}/ws/sensors/", addr))
        .options(
            ChannelOptions::default()
                .with_max_reconnect_attempts(2)
                .with_reconnect_delay_ms(10),
        )
        .event_handlers(EventHandlers::new().on_error(move |e| {
            let _ = tx.send(e);
        }))
        .build()
        .unwrap();
    let mut states = channel.watch_state();

    channel.connect().unwrap();
    wait_for_state(&mut states, ChannelState::Disconnected).await;

    let mut count = 0;
    while let Ok(error) = errors.try_recv() {
        assert!(error.recoverable);
        count += 1;
    }
    assert_eq!(count, 3);
}
