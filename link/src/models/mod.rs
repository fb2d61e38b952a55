//! Data models for the twin-link client library.
//!
//! Defines channel configuration, the JSON messages exchanged with the
//! monitoring server, and the notification types shown to users.

pub mod channel_options;
pub mod client_message;
pub mod notification;
mod nullable;
pub mod sensor_alert;
pub mod sensor_reading;
pub mod server_message;


pub use channel_options::ChannelOptions;
pub use client_message::ClientMessage;
pub use notification::{Notification, NotificationId, NotificationKind};
pub use sensor_alert::SensorAlert;
pub use sensor_reading::SensorReading;
pub use server_message::{ElementSelection, ServerMessage};
