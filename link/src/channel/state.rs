use std::fmt;

/// Lifecycle state of a [`ReconnectingChannel`](super::ReconnectingChannel).
///
/// ```text
///  Disconnected ──connect()──▶ Connecting ──open──▶ Connected
///       ▲                        │   ▲                  │
///       │ attempts exhausted     │   │ timer            │ lost
///       └────────────────────────┴─▶ Reconnecting ◀─────┘
///
///  any state ──close()──▶ Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// Idle. Either never connected, reconnect disabled, or attempts exhausted.
    #[default]
    Disconnected,
    /// A transport open is in flight.
    Connecting,
    /// The transport is open; `send` writes frames.
    Connected,
    /// Waiting on the backoff timer before the next attempt.
    Reconnecting,
    /// Explicitly closed. Terminal.
    Closed,
}

impl ChannelState {
    /// Returns `true` only for [`ChannelState::Closed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::Closed)
    }

    /// Returns `true` while a connection is open or being established.
    pub fn is_active(&self) -> bool {
        matches!(self, ChannelState::Connecting | ChannelState::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Reconnecting => "reconnecting",
            ChannelState::Closed => "closed",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
