//! Channel lifecycle event handlers.
//!
//! Provides callback-based hooks for observing a
//! [`ReconnectingChannel`](crate::ReconnectingChannel):
//!
//! - [`on_open`](EventHandlers::on_open): Fired when the transport connection is established
//! - [`on_message`](EventHandlers::on_message): Fired for every inbound frame that parses as JSON
//! - [`on_error`](EventHandlers::on_error): Fired on transport failures and undecodable frames
//! - [`on_close`](EventHandlers::on_close): Fired when an established or attempted connection ends
//! - [`on_receive`](EventHandlers::on_receive): Optional debug hook for all raw incoming frames
//! - [`on_send`](EventHandlers::on_send): Optional debug hook for all raw outgoing frames
//!
//! Handlers run on the channel's connection task, synchronously, in the
//! order the transport delivers events. No internal lock is held while a
//! handler runs, so handlers may call back into the channel (`send`,
//! `state`, `close`).
//!
//! # Example
//!
//! ```rust
//! use twin_link::EventHandlers;
//!
//! let handlers = EventHandlers::new()
//!     .on_open(|| println!("Connected"))
//!     .on_message(|msg| println!("Message: {}", msg))
//!     .on_close(|reason| println!("Closed: {}", reason))
//!     .on_error(|err| eprintln!("Error: {}", err));
//! ```

use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Reason for a close event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket close code, if available (e.g. 1000 = normal, 1006 = abnormal).
    pub code: Option<u16>,
}

impl CloseReason {
    /// Normal closure code sent when the client closes the channel.
    pub const NORMAL: u16 = 1000;

    /// Create a new close reason with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a new close reason with a message and close code.
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Category of a [`ChannelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorKind {
    /// The transport failed to open, failed mid-stream, or closed unexpectedly.
    Transport,
    /// An open attempt exceeded the configured connection timeout.
    Timeout,
    /// An inbound frame could not be decoded as JSON. Never affects channel state.
    Decode,
}

impl fmt::Display for ChannelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelErrorKind::Transport => write!(f, "transport"),
            ChannelErrorKind::Timeout => write!(f, "timeout"),
            ChannelErrorKind::Decode => write!(f, "decode"),
        }
    }
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    /// What failed.
    pub kind: ChannelErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Whether the reconnect algorithm may recover from this error.
    pub recoverable: bool,
}

impl ChannelError {
    /// Create a new channel error.
    pub fn new(kind: ChannelErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable,
        }
    }

    /// A recoverable transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorKind::Transport, message, true)
    }

    /// A recoverable connection timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorKind::Timeout, message, true)
    }

    /// A decode failure local to one inbound frame.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorKind::Decode, message, false)
    }

    /// Returns `true` for frame decode failures.
    pub fn is_decode(&self) -> bool {
        self.kind == ChannelErrorKind::Decode
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// Type alias for the on_open callback.
pub type OnOpenCallback = Arc<dyn Fn() + Send + Sync>;

/// Type alias for the on_message callback.
pub type OnMessageCallback = Arc<dyn Fn(JsonValue) + Send + Sync>;

/// Type alias for the on_error callback.
pub type OnErrorCallback = Arc<dyn Fn(ChannelError) + Send + Sync>;

/// Type alias for the on_close callback.
pub type OnCloseCallback = Arc<dyn Fn(CloseReason) + Send + Sync>;

/// Type alias for the on_receive callback (debug hook for all inbound frames).
pub type OnReceiveCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Type alias for the on_send callback (debug hook for all outbound frames).
pub type OnSendCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Channel lifecycle event handlers.
///
/// All handlers are optional; an unregistered handler is a no-op. Handlers
/// are `Send + Sync` so they can be invoked from the tokio runtime.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_open: Option<OnOpenCallback>,
    pub(crate) on_message: Option<OnMessageCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_close: Option<OnCloseCallback>,
    pub(crate) on_receive: Option<OnReceiveCallback>,
    pub(crate) on_send: Option<OnSendCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .field("on_send", &self.on_send.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create a new empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when the transport connection is established.
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked with every inbound frame parsed as JSON.
    pub fn on_message(mut self, f: impl Fn(JsonValue) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a transport or decode error occurs.
    ///
    /// The callback receives a [`ChannelError`]; decode errors are
    /// `recoverable == false` but never change the channel state.
    pub fn on_error(mut self, f: impl Fn(ChannelError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a connection (or connection attempt) ends.
    ///
    /// By the time this fires the channel has already moved to its next
    /// state, so `channel.state()` tells whether a reconnect is scheduled.
    pub fn on_close(mut self, f: impl Fn(CloseReason) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked for every raw frame received from the server.
    ///
    /// This is a **debug/tracing hook**: it sees the raw text before parsing.
    pub fn on_receive(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked for every raw frame written to the server.
    pub fn on_send(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_open.is_some()
            || self.on_message.is_some()
            || self.on_error.is_some()
            || self.on_close.is_some()
            || self.on_receive.is_some()
            || self.on_send.is_some()
    }

    // ---------------------------------------------------------------
    // Internal dispatch helpers
    // ---------------------------------------------------------------

    pub(crate) fn emit_open(&self) {
        if let Some(cb) = &self.on_open {
            cb();
        }
    }

    pub(crate) fn emit_message(&self, message: JsonValue) {
        if let Some(cb) = &self.on_message {
            cb(message);
        }
    }

    pub(crate) fn emit_error(&self, error: ChannelError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_close(&self, reason: CloseReason) {
        if let Some(cb) = &self.on_close {
            cb(reason);
        }
    }

    pub(crate) fn emit_receive(&self, raw: &str) {
        if let Some(cb) = &self.on_receive {
            cb(raw);
        }
    }

    pub(crate) fn emit_send(&self, raw: &str) {
        if let Some(cb) = &self.on_send {
            cb(raw);
        }
    }
}
