use serde::{Deserialize, Deserializer, Serialize};

use super::notification::NotificationKind;
use super::nullable::or_default;

/// An alert raised server-side for a sensor, pushed in an `alert` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAlert {
    pub id: u64,
    pub sensor_id: u64,

    #[serde(default, deserialize_with = "or_default")]
    pub sensor_name: String,

    pub message: String,

    /// Alert level: `info`, `warning`, `error` or `critical`.
    /// Missing or `null` means `warning`.
    #[serde(default = "default_severity", deserialize_with = "severity_or_default")]
    pub severity: String,

    /// ISO-8601 creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_severity() -> String {
    "warning".to_string()
}

fn severity_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_severity))
}

impl SensorAlert {
    /// Notification kind matching this alert's severity.
    pub fn notification_kind(&self) -> NotificationKind {
        NotificationKind::from_severity(&self.severity)
    }

    /// Text shown to the user, prefixed with the sensor name when known.
    pub fn display_message(&self) -> String {
        if self.sensor_name.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.sensor_name, self.message)
        }
    }
}
