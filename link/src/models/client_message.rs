use serde::{Deserialize, Serialize};

/// Client-to-server messages understood by the monitoring server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive / latency probe; the server echoes `timestamp` in a `pong`.
    Ping {
        /// Millis since Unix epoch at send time
        timestamp: u64,
    },

    /// Ask for live updates of a single sensor
    SubscribeSensor {
        /// Sensor primary key
        sensor_id: u64,
    },

    /// Broadcast a 3D model element selection to the other viewers of a plant
    ElementSelected {
        /// IFC GlobalId (or viewer-specific id) of the selected element
        element_id: String,
    },
}
