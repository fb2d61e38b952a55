//! Error types for twin-link

use thiserror::Error;

/// Errors returned by the twin-link public API.
///
/// Transport failures that happen *inside* a running channel are never
/// returned from these APIs; they are reported through the `on_error` hook
/// as a [`ChannelError`](crate::event_handlers::ChannelError) and drive the
/// reconnect algorithm instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TwinLinkError {
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The channel was explicitly closed and can no longer be connected.
    #[error("Channel is closed")]
    ChannelClosed,

    /// `connect()` was called outside of a Tokio runtime.
    #[error("No Tokio runtime available to drive the channel")]
    RuntimeUnavailable,
}

impl From<serde_json::Error> for TwinLinkError {
    fn from(err: serde_json::Error) -> Self {
        TwinLinkError::SerializationError(err.to_string())
    }
}

/// Result type for twin-link operations
pub type Result<T> = std::result::Result<T, TwinLinkError>;
