use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::nullable::or_default;
use super::sensor_alert::SensorAlert;
use super::sensor_reading::SensorReading;

/// Messages sent from the monitoring server to the client.
///
/// Frames with an unknown `type` are not errors; [`ServerMessage::from_value`]
/// returns `None` for them and callers keep the raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message sent right after the server accepts the socket
    Connection {
        #[serde(default, deserialize_with = "or_default")]
        message: String,
    },

    /// Reply to a client `ping`
    Pong {
        /// The `timestamp` echoed from the ping, when the client sent one
        #[serde(default)]
        timestamp: Option<u64>,
    },

    /// Confirms a `subscribe_sensor` request
    Subscribed {
        #[serde(default)]
        sensor_id: Option<u64>,
    },

    /// New sensor sample
    SensorUpdate { data: SensorReading },

    /// New sensor alert
    Alert { data: SensorAlert },

    /// Another viewer selected an element in the 3D plant model
    ElementSelected {
        element_id: String,
        /// Username of the selecting viewer, or `Anonymous`
        #[serde(default, deserialize_with = "or_default")]
        user: String,
    },

    /// The server rejected a frame
    Error {
        #[serde(default, deserialize_with = "or_default")]
        message: String,
    },
}

/// Element selection broadcast by the plant viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSelection {
    pub element_id: String,
    pub user: String,
}

impl ServerMessage {
    /// Interpret an already-parsed JSON frame.
    ///
    /// Returns `None` when the frame has no recognised `type` or its payload
    /// does not match the expected shape.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                log::debug!(
                    "[twin-link] Unhandled server message type {:?}: {}",
                    value.get("type"),
                    e
                );
                None
            },
        }
    }

    /// The wire `type` tag of this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Connection { .. } => "connection",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::Subscribed { .. } => "subscribed",
            ServerMessage::SensorUpdate { .. } => "sensor_update",
            ServerMessage::Alert { .. } => "alert",
            ServerMessage::ElementSelected { .. } => "element_selected",
            ServerMessage::Error { .. } => "error",
        }
    }
}
