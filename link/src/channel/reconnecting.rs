//! Reconnecting real-time channel.
//!
//! Keeps one logical, always-on connection over an unreliable transport:
//!
//! - At most one transport connection open at a time (generation-checked tasks)
//! - Automatic reconnection with exponential backoff and a bounded attempt count
//! - At most one pending reconnect timer, owned by the channel and cancelled
//!   by `close()`, a manual `connect()`, or a successful open
//! - JSON text framing; undecodable inbound frames are reported, never fatal
//! - Optional application-level keepalive pings

use crate::{
    channel::{backoff, state::ChannelState},
    error::{Result, TwinLinkError},
    event_handlers::{ChannelError, CloseReason, EventHandlers},
    models::{ChannelOptions, ClientMessage},
    transport::{
        normalize_endpoint, Frame, Transport, TransportConnection, WsTransport,
        MAX_TEXT_FRAME_BYTES,
    },
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::{
    sync::{Arc, Weak},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant as TokioInstant, Interval, MissedTickBehavior},
};

/// Current time in millis since Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Commands ────────────────────────────────────────────────────────────────

/// Commands from the public API to the live connection task.
enum Outbound {
    /// A serialized JSON text frame.
    Frame(String),
    /// Close the transport; the channel is shutting down.
    Close,
}

/// Why the frame pump of a live connection stopped.
enum PumpExit {
    ClosedByClient,
    Lost(CloseReason),
}

// ── Shared bookkeeping ──────────────────────────────────────────────────────

/// Mutable channel bookkeeping. Guarded by a mutex that is never held across
/// an `.await` or while user callbacks run.
struct Core {
    state: ChannelState,
    /// Consecutive failed attempts since the last successful open.
    attempt: u32,
    /// Bumped for every connect attempt; tasks from older generations are stale.
    generation: u64,
    pending_timer: Option<JoinHandle<()>>,
    pending_delay: Option<Duration>,
    /// Present only while `Connected`.
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

struct Inner {
    endpoint: String,
    options: ChannelOptions,
    handlers: EventHandlers,
    transport: Arc<dyn Transport>,
    core: Mutex<Core>,
    state_tx: watch::Sender<ChannelState>,
}

impl Inner {
    fn set_state(&self, core: &mut Core, state: ChannelState) {
        if core.state != state {
            log::debug!(
                "[twin-link] {} state {} -> {}",
                self.endpoint,
                core.state,
                state
            );
        }
        core.state = state;
        self.state_tx.send_replace(state);
    }

    fn cancel_timer(core: &mut Core) {
        if let Some(timer) = core.pending_timer.take() {
            timer.abort();
        }
        core.pending_delay = None;
    }

    /// Start a new connect attempt. Caller holds the core lock and must be
    /// inside a Tokio runtime.
    fn begin_attempt(self: &Arc<Self>, core: &mut Core) {
        Self::cancel_timer(core);
        core.generation += 1;
        let generation = core.generation;
        self.set_state(core, ChannelState::Connecting);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_connection(generation).await;
        });
    }

    /// Backoff timer fired.
    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut core = self.core.lock();
        if core.state != ChannelState::Reconnecting || core.generation != generation {
            return;
        }
        core.pending_timer = None;
        core.pending_delay = None;
        self.begin_attempt(&mut core);
    }

    /// Transport closed or failed for connection `generation`; run the
    /// reconnect algorithm. Returns the state the channel moved to, or
    /// `None` if the event was stale.
    fn handle_disconnect(self: &Arc<Self>, generation: u64) -> Option<ChannelState> {
        let mut core = self.core.lock();
        if core.generation != generation || core.state == ChannelState::Closed {
            return None;
        }
        core.outbound = None;

        if !self.options.auto_reconnect {
            self.set_state(&mut core, ChannelState::Disconnected);
            return Some(ChannelState::Disconnected);
        }

        let max = self.options.max_reconnect_attempts;
        if core.attempt >= max {
            log::warn!(
                "[twin-link] Max reconnection attempts ({}) reached for {}",
                max,
                self.endpoint
            );
            self.set_state(&mut core, ChannelState::Disconnected);
            return Some(ChannelState::Disconnected);
        }

        core.attempt += 1;
        let delay = backoff::reconnect_delay(
            self.options.reconnect_delay_ms,
            core.attempt,
            self.options.max_reconnect_delay_ms,
        );
        log::info!(
            "[twin-link] Attempting reconnection in {}ms (attempt {}/{})",
            delay.as_millis(),
            core.attempt,
            max
        );

        let weak: Weak<Inner> = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire_reconnect(generation);
            }
        });
        core.pending_timer = Some(timer);
        core.pending_delay = Some(delay);
        self.set_state(&mut core, ChannelState::Reconnecting);
        Some(ChannelState::Reconnecting)
    }

    async fn open_transport(&self) -> Result<Box<dyn TransportConnection>> {
        let open = self.transport.open(&self.endpoint);
        match self.options.connection_timeout() {
            Some(limit) => match tokio::time::timeout(limit, open).await {
                Ok(result) => result,
                Err(_) => Err(TwinLinkError::TimeoutError(format!(
                    "Connection timeout ({:?})",
                    limit
                ))),
            },
            None => open.await,
        }
    }

    /// One connect attempt plus, on success, the lifetime of that connection.
    async fn run_connection(self: Arc<Self>, generation: u64) {
        let mut conn = match self.open_transport().await {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("[twin-link] Connection to {} failed: {}", self.endpoint, e);
                if !self.is_current(generation) {
                    return;
                }
                let error = match &e {
                    TwinLinkError::TimeoutError(msg) => ChannelError::timeout(msg.clone()),
                    other => ChannelError::transport(other.to_string()),
                };
                self.handlers.emit_error(error);
                if self.handle_disconnect(generation).is_some() {
                    self.handlers
                        .emit_close(CloseReason::with_code(e.to_string(), 1006));
                }
                return;
            },
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let superseded = {
            let mut core = self.core.lock();
            if core.generation != generation || core.state == ChannelState::Closed {
                true
            } else {
                core.attempt = 0;
                Self::cancel_timer(&mut core);
                core.outbound = Some(tx);
                self.set_state(&mut core, ChannelState::Connected);
                false
            }
        };
        if superseded {
            log::debug!("[twin-link] Discarding superseded connection to {}", self.endpoint);
            let _ = conn.close().await;
            return;
        }
        log::info!("[twin-link] Connected to {}", self.endpoint);
        self.handlers.emit_open();

        match self.pump(&mut conn, rx).await {
            PumpExit::ClosedByClient => {
                log::info!("[twin-link] Channel to {} closed by client", self.endpoint);
                self.handlers.emit_close(CloseReason::with_code(
                    "Closed by client",
                    CloseReason::NORMAL,
                ));
            },
            PumpExit::Lost(reason) => {
                log::warn!("[twin-link] Connection to {} lost: {}", self.endpoint, reason);
                self.handle_disconnect(generation);
                self.handlers.emit_close(reason);
            },
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let core = self.core.lock();
        core.generation == generation && core.state != ChannelState::Closed
    }

    /// Move frames between the transport and the channel until either side
    /// ends the connection.
    async fn pump(
        &self,
        conn: &mut Box<dyn TransportConnection>,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
    ) -> PumpExit {
        let mut keepalive = self.options.ping_interval().map(|every| {
            let mut interval = tokio::time::interval_at(TokioInstant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                biased;

                cmd = outbound.recv() => {
                    match cmd {
                        Some(Outbound::Frame(text)) => {
                            self.handlers.emit_send(&text);
                            if let Err(e) = conn.send(Frame::Text(text)).await {
                                self.handlers.emit_error(ChannelError::transport(e.to_string()));
                                return PumpExit::Lost(CloseReason::with_code(e.to_string(), 1006));
                            }
                        },
                        Some(Outbound::Close) | None => {
                            if let Err(e) = conn.close().await {
                                log::debug!("[twin-link] Close handshake failed: {}", e);
                            }
                            return PumpExit::ClosedByClient;
                        },
                    }
                }

                _ = next_tick(&mut keepalive) => {
                    let ping = ClientMessage::Ping { timestamp: now_ms() };
                    match serde_json::to_string(&ping) {
                        Ok(text) => {
                            self.handlers.emit_send(&text);
                            if let Err(e) = conn.send(Frame::Text(text)).await {
                                log::warn!("[twin-link] Keepalive ping failed: {}", e);
                                self.handlers.emit_error(ChannelError::transport(e.to_string()));
                                return PumpExit::Lost(CloseReason::with_code(
                                    format!("Keepalive ping failed: {}", e),
                                    1006,
                                ));
                            }
                        },
                        Err(e) => log::warn!("[twin-link] Failed to serialize ping: {}", e),
                    }
                }

                frame = conn.recv() => {
                    match frame {
                        Some(Ok(Frame::Text(text))) => self.dispatch_text(&text),
                        Some(Ok(Frame::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => self.dispatch_text(&text),
                            Err(e) => {
                                log::warn!("[twin-link] Binary frame is not UTF-8: {}", e);
                                self.handlers.emit_error(ChannelError::decode(format!(
                                    "Binary frame is not UTF-8: {}", e
                                )));
                            },
                        },
                        Some(Ok(Frame::Ping(payload))) => {
                            if let Err(e) = conn.send(Frame::Pong(payload)).await {
                                log::debug!("[twin-link] Failed to answer ping: {}", e);
                            }
                        },
                        Some(Ok(Frame::Pong(_))) => {
                            log::debug!("[twin-link] Received pong frame");
                        },
                        Some(Ok(Frame::Close(reason))) => {
                            return PumpExit::Lost(
                                reason.unwrap_or_else(|| CloseReason::new("Server closed connection")),
                            );
                        },
                        Some(Err(e)) => {
                            self.handlers.emit_error(ChannelError::transport(e.to_string()));
                            return PumpExit::Lost(CloseReason::with_code(
                                format!("WebSocket error: {}", e),
                                1006,
                            ));
                        },
                        None => {
                            return PumpExit::Lost(CloseReason::with_code("WebSocket stream ended", 1006));
                        },
                    }
                }
            }
        }
    }

    /// Parse one inbound text frame and hand it to the consumer.
    fn dispatch_text(&self, text: &str) {
        if text.len() > MAX_TEXT_FRAME_BYTES {
            log::warn!("[twin-link] Text frame too large ({} bytes)", text.len());
            self.handlers.emit_error(ChannelError::decode(format!(
                "Text frame too large ({} bytes)",
                text.len()
            )));
            return;
        }
        self.handlers.emit_receive(text);
        match serde_json::from_str::<JsonValue>(text) {
            Ok(message) => self.handlers.emit_message(message),
            Err(e) => {
                log::warn!("[twin-link] Failed to parse message: {}", e);
                self.handlers
                    .emit_error(ChannelError::decode(format!("Invalid JSON frame: {}", e)));
            },
        }
    }
}

async fn next_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending::<()>().await,
    }
}

// ── ReconnectingChannel (public handle) ─────────────────────────────────────

/// A logical always-on connection to a real-time endpoint.
///
/// `connect()`, `send()` and `close()` never block: the transport is driven
/// by tasks spawned on the current Tokio runtime and results are reported
/// through [`EventHandlers`]. Dropping the channel closes it.
///
/// # Example
///
/// ```rust,no_run
/// use twin_link::{ChannelOptions, EventHandlers, ReconnectingChannel};
///
/// # async fn example() -> twin_link::Result<()> {
/// let channel = ReconnectingChannel::builder()
///     .endpoint("ws://localhost:8000/ws/sensors/")
///     .options(ChannelOptions::default().with_max_reconnect_attempts(10))
///     .event_handlers(EventHandlers::new().on_message(|msg| println!("{}", msg)))
///     .build()?;
///
/// channel.connect()?;
/// channel.send(&serde_json::json!({"type": "subscribe_sensor", "sensor_id": 1}));
/// # Ok(())
/// # }
/// ```
pub struct ReconnectingChannel {
    inner: Arc<Inner>,
}

impl ReconnectingChannel {
    /// Create a new builder for configuring the channel
    pub fn builder() -> ReconnectingChannelBuilder {
        ReconnectingChannelBuilder::new()
    }

    /// Open the transport.
    ///
    /// A no-op while `Connecting` or `Connected`. From `Reconnecting` the
    /// pending timer is cancelled and the attempt starts now; from
    /// `Disconnected` the attempt counter is reset first. Fails with
    /// [`TwinLinkError::ChannelClosed`] once the channel is closed and with
    /// [`TwinLinkError::RuntimeUnavailable`] outside a Tokio runtime.
    pub fn connect(&self) -> Result<()> {
        let mut core = self.inner.core.lock();
        match core.state {
            ChannelState::Closed => return Err(TwinLinkError::ChannelClosed),
            ChannelState::Connecting | ChannelState::Connected => return Ok(()),
            ChannelState::Disconnected => core.attempt = 0,
            ChannelState::Reconnecting => {},
        }
        if Handle::try_current().is_err() {
            return Err(TwinLinkError::RuntimeUnavailable);
        }
        self.inner.begin_attempt(&mut core);
        Ok(())
    }

    /// Alias for [`connect`](Self::connect), for manual retry after attempts ran out.
    pub fn reconnect(&self) -> Result<()> {
        self.connect()
    }

    /// Serialize `payload` as a JSON text frame and hand it to the transport.
    ///
    /// Returns `false` without writing anything unless the channel is
    /// `Connected`. Nothing is buffered for later delivery.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("[twin-link] Failed to serialize outbound payload: {}", e);
                return false;
            },
        };

        let core = self.inner.core.lock();
        if core.state != ChannelState::Connected {
            log::warn!(
                "[twin-link] Dropping outbound frame, channel is {}",
                core.state
            );
            return false;
        }
        match &core.outbound {
            Some(tx) => tx.send(Outbound::Frame(text)).is_ok(),
            None => false,
        }
    }

    /// Close the channel permanently.
    ///
    /// Cancels any pending reconnect timer before returning, closes the
    /// transport if open, and moves to `Closed`. Idempotent.
    pub fn close(&self) {
        let mut core = self.inner.core.lock();
        if core.state == ChannelState::Closed {
            return;
        }
        Inner::cancel_timer(&mut core);
        if let Some(tx) = core.outbound.take() {
            let _ = tx.send(Outbound::Close);
        }
        self.inner.set_state(&mut core, ChannelState::Closed);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.inner.core.lock().state
    }

    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.inner.core.lock().attempt
    }

    /// Delay of the currently scheduled reconnect, if any.
    pub fn pending_reconnect_delay(&self) -> Option<Duration> {
        self.inner.core.lock().pending_delay
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state_tx.subscribe()
    }

    /// The normalised endpoint URI.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// The options this channel was built with.
    pub fn options(&self) -> &ChannelOptions {
        &self.inner.options
    }
}

impl Drop for ReconnectingChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ReconnectingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("ReconnectingChannel")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &core.state)
            .field("attempt", &core.attempt)
            .finish()
    }
}

/// Builder for [`ReconnectingChannel`].
pub struct ReconnectingChannelBuilder {
    endpoint: Option<String>,
    options: ChannelOptions,
    handlers: EventHandlers,
    transport: Option<Arc<dyn Transport>>,
}

impl ReconnectingChannelBuilder {
    fn new() -> Self {
        Self {
            endpoint: None,
            options: ChannelOptions::default(),
            handlers: EventHandlers::default(),
            transport: None,
        }
    }

    /// Endpoint URI (`ws://`, `wss://`, `http://` or `https://`)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reconnect and transport options
    pub fn options(mut self, options: ChannelOptions) -> Self {
        self.options = options;
        self
    }

    /// Lifecycle and message callbacks
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Replace the default WebSocket transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the channel. Does not connect.
    pub fn build(self) -> Result<ReconnectingChannel> {
        let endpoint = self.endpoint.ok_or_else(|| {
            TwinLinkError::ConfigurationError("endpoint is required".to_string())
        })?;
        let endpoint = normalize_endpoint(&endpoint)?;

        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        let inner = Inner {
            endpoint,
            options: self.options,
            handlers: self.handlers,
            transport: self.transport.unwrap_or_else(|| Arc::new(WsTransport)),
            core: Mutex::new(Core {
                state: ChannelState::Disconnected,
                attempt: 0,
                generation: 0,
                pending_timer: None,
                pending_delay: None,
                outbound: None,
            }),
            state_tx,
        };

        Ok(ReconnectingChannel {
            inner: Arc::new(inner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_endpoint() {
        assert!(matches!(
            ReconnectingChannel::builder().build(),
            Err(TwinLinkError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_builder_normalizes_endpoint() {
        let channel = ReconnectingChannel::builder()
            .endpoint("https://twin.example.com/ws/sensors/")
            .build()
            .unwrap();
        assert_eq!(channel.endpoint(), "wss://twin.example.com/ws/sensors/");
        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert_eq!(channel.attempt(), 0);
    }

    #[test]
    fn test_connect_outside_runtime_fails() {
        let channel = ReconnectingChannel::builder()
            .endpoint("ws://localhost:9/ws")
            .build()
            .unwrap();
        assert_eq!(channel.connect(), Err(TwinLinkError::RuntimeUnavailable));
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[test]
    fn test_send_before_connect_returns_false() {
        let channel = ReconnectingChannel::builder()
            .endpoint("ws://localhost:9/ws")
            .build()
            .unwrap();
        assert!(!channel.send(&serde_json::json!({"type": "ping"})));
    }

    #[test]
    fn test_close_is_terminal_and_idempotent() {
        let channel = ReconnectingChannel::builder()
            .endpoint("ws://localhost:9/ws")
            .build()
            .unwrap();
        let states = channel.watch_state();
        channel.close();
        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(*states.borrow(), ChannelState::Closed);
        assert_eq!(channel.connect(), Err(TwinLinkError::ChannelClosed));
    }
}
