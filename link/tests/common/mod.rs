#![allow(dead_code)]
//! Scripted in-memory transport shared by the channel and consumer tests.
//!
//! Each `open()` consumes the next [`Outcome`] from the script; when the
//! script is empty, opens fail. Accepted connections hand a [`ServerEnd`]
//! to the test so it can push frames, read what the client wrote, and drop
//! the connection.

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};
use twin_link::{
    ChannelError, CloseReason, EventHandlers, Frame, Transport, TransportConnection, TwinLinkError,
};

/// What the next `open()` does.
#[derive(Debug, Clone)]
pub enum Outcome {
    Fail(String),
    Accept,
    /// Never resolves; only a connection timeout ends the attempt.
    Hang,
}

#[derive(Default)]
struct Script {
    outcomes: Mutex<VecDeque<Outcome>>,
    opens: Mutex<Vec<Instant>>,
    servers: Mutex<VecDeque<ServerEnd>>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Script>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let transport = Self::default();
        transport.push(outcomes);
        transport
    }

    pub fn push(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.script.outcomes.lock().extend(outcomes);
    }

    /// Times at which `open()` was called.
    pub fn opens(&self) -> Vec<Instant> {
        self.script.opens.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.script.opens.lock().len()
    }

    /// Gaps between consecutive opens, in milliseconds.
    pub fn open_gaps_ms(&self) -> Vec<u128> {
        self.opens()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }

    /// Server side of the oldest accepted connection not yet taken.
    pub fn take_server(&self) -> Option<ServerEnd> {
        self.script.servers.lock().pop_front()
    }
}

impl Transport for ScriptedTransport {
    fn open(
        &self,
        _endpoint: &str,
    ) -> BoxFuture<'static, twin_link::Result<Box<dyn TransportConnection>>> {
        self.script.opens.lock().push(Instant::now());
        let outcome = self
            .script
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Outcome::Fail("connection refused".to_string()));

        match outcome {
            Outcome::Fail(message) => {
                Box::pin(async move { Err(TwinLinkError::WebSocketError(message)) })
            },
            Outcome::Hang => {
                Box::pin(std::future::pending::<twin_link::Result<Box<dyn TransportConnection>>>())
            },
            Outcome::Accept => {
                let (to_client, from_server) = mpsc::unbounded_channel();
                let (to_server, from_client) = mpsc::unbounded_channel();
                let closed = Arc::new(AtomicBool::new(false));
                self.script.servers.lock().push_back(ServerEnd {
                    to_client: Some(to_client),
                    from_client,
                    closed: closed.clone(),
                });
                let conn = ScriptedConnection {
                    from_server,
                    to_server,
                    closed,
                };
                Box::pin(async move { Ok(Box::new(conn) as Box<dyn TransportConnection>) })
            },
        }
    }
}

struct ScriptedConnection {
    from_server: mpsc::UnboundedReceiver<Frame>,
    to_server: mpsc::UnboundedSender<Frame>,
    closed: Arc<AtomicBool>,
}

impl TransportConnection for ScriptedConnection {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, twin_link::Result<()>> {
        let result = self
            .to_server
            .send(frame)
            .map_err(|_| TwinLinkError::WebSocketError("peer gone".to_string()));
        Box::pin(async move { result })
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<twin_link::Result<Frame>>> {
        Box::pin(async move { self.from_server.recv().await.map(Ok) })
    }

    fn close(&mut self) -> BoxFuture<'_, twin_link::Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Test-side handle of one accepted connection.
pub struct ServerEnd {
    to_client: Option<mpsc::UnboundedSender<Frame>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
    closed: Arc<AtomicBool>,
}

impl ServerEnd {
    pub fn push_json(&self, value: JsonValue) {
        self.push_text(value.to_string());
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Frame::Text(text.into()));
    }

    pub fn push(&self, frame: Frame) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(frame);
        }
    }

    /// End the stream as if the network dropped.
    pub fn drop_connection(&mut self) {
        self.to_client = None;
    }

    /// Whether the client performed a close handshake.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Text frames the client has written so far, parsed as JSON.
    pub fn received_json(&mut self) -> Vec<JsonValue> {
        let mut out = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            if let Frame::Text(text) = frame {
                if let Ok(value) = serde_json::from_str(&text) {
                    out.push(value);
                }
            }
        }
        out
    }
}

/// Everything the channel reported through its handlers, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Message(JsonValue),
    Error(ChannelError),
    Close(CloseReason),
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn handlers(&self) -> EventHandlers {
        let (a, b, c, d) = (
            self.events.clone(),
            self.events.clone(),
            self.events.clone(),
            self.events.clone(),
        );
        EventHandlers::new()
            .on_open(move || a.lock().push(Event::Open))
            .on_message(move |m| b.lock().push(Event::Message(m)))
            .on_error(move |e| c.lock().push(Event::Error(e)))
            .on_close(move |r| d.lock().push(Event::Close(r)))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.count(|e| matches!(e, Event::Open))
    }

    pub fn closes(&self) -> Vec<CloseReason> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Close(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ChannelError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<JsonValue> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

/// Let spawned connection tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock by `ms` and let everything due run.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
