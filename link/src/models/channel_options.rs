use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect and transport options for a [`ReconnectingChannel`](crate::ReconnectingChannel).
///
/// # Example
///
/// ```rust
/// use twin_link::ChannelOptions;
///
/// let options = ChannelOptions::default()
///     .with_auto_reconnect(true)
///     .with_reconnect_delay_ms(2000)
///     .with_max_reconnect_attempts(10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOptions {
    /// Enable automatic reconnection on connection loss or failed open.
    /// Default: true. When false a failed connect leaves the channel `Disconnected`.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Number of consecutive reconnect attempts before giving up.
    /// Default: 5
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Base delay in milliseconds; attempt `n` waits `base * 2^(n-1)`.
    /// Default: 1000ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Optional ceiling on a single backoff delay in milliseconds.
    /// Default: None (pure exponential backoff, no cap)
    #[serde(default)]
    pub max_reconnect_delay_ms: Option<u64>,

    /// Timeout for a single transport open attempt in milliseconds.
    /// Set to 0 to wait indefinitely. Default: 10000ms
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Interval for application-level `{"type":"ping"}` frames while connected.
    /// Set to 0 to disable. Default: 0 (disabled)
    #[serde(default)]
    pub ping_interval_ms: u64,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_connection_timeout_ms() -> u64 {
    10_000
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: None,
            connection_timeout_ms: default_connection_timeout_ms(),
            ping_interval_ms: 0,
        }
    }
}

impl ChannelOptions {
    /// Create new channel options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to automatically reconnect on connection loss
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the number of reconnect attempts before the channel gives up
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the base delay between reconnection attempts (in milliseconds)
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Cap a single backoff delay (in milliseconds); `None` removes the cap
    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: Option<u64>) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Set the transport open timeout (in milliseconds); 0 disables it
    pub fn with_connection_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connection_timeout_ms = timeout_ms;
        self
    }

    /// Set the keepalive ping interval (in milliseconds); 0 disables it
    pub fn with_ping_interval_ms(mut self, interval_ms: u64) -> Self {
        self.ping_interval_ms = interval_ms;
        self
    }

    /// Connection timeout as a `Duration`, or `None` when disabled.
    pub fn connection_timeout(&self) -> Option<Duration> {
        (self.connection_timeout_ms > 0).then(|| Duration::from_millis(self.connection_timeout_ms))
    }

    /// Keepalive interval as a `Duration`, or `None` when disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }
}
