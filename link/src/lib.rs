//! # twin-link
//!
//! Real-time client library for the facilities digital twin.
//!
//! - [`ReconnectingChannel`]: one logical, always-on JSON channel over an
//!   unreliable WebSocket, with exponential-backoff reconnection
//! - [`NotificationCenter`]: ordered, auto-expiring user notifications
//! - [`SensorDashboard`]: a channel consumer that tracks sensor readings
//!   and alerts and reports connection changes as notifications
//!
//! ## Example
//!
//! ```rust,no_run
//! use twin_link::{ChannelOptions, NotificationCenter, SensorDashboard};
//!
//! # async fn example() -> twin_link::Result<()> {
//! let notifications = NotificationCenter::default();
//! let dashboard = SensorDashboard::attach(
//!     "ws://localhost:8000/ws/sensors/",
//!     ChannelOptions::default(),
//!     notifications.clone(),
//! )?;
//!
//! dashboard.connect()?;
//! dashboard.subscribe_sensor(7);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod consumer;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod notifications;
pub mod transport;

pub use channel::{ChannelState, ReconnectingChannel, ReconnectingChannelBuilder};
pub use consumer::{DashboardEvent, DashboardState, SensorDashboard};
pub use error::{Result, TwinLinkError};
pub use event_handlers::{ChannelError, ChannelErrorKind, CloseReason, EventHandlers};
pub use models::{
    ChannelOptions, ClientMessage, ElementSelection, Notification, NotificationId,
    NotificationKind, SensorAlert, SensorReading, ServerMessage,
};
pub use notifications::{NotificationCenter, NotificationConfig, DEFAULT_NOTIFICATION_DURATION};
pub use transport::{normalize_endpoint, Frame, Transport, TransportConnection, WsTransport};
