//! Output formatting for the monitor.
//!
//! Human-readable lines by default; one JSON object per line with `--json`.

use serde_json::json;
use twin_link::{ElementSelection, Notification, NotificationKind, SensorReading};

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn reading(&self, reading: &SensorReading) -> String {
        match self.format {
            OutputFormat::Json => json!({"event": "reading", "data": reading}).to_string(),
            OutputFormat::Text => {
                let at = reading.timestamp.as_deref().unwrap_or("-");
                let mut line = format!(
                    "[{}] sensor {:>4}  {}",
                    at,
                    reading.sensor_id,
                    reading.display_value()
                );
                if reading.quality < 100.0 {
                    line.push_str(&format!("  (quality {:.0}%)", reading.quality));
                }
                line
            },
        }
    }

    pub fn notification(&self, notification: &Notification) -> String {
        match self.format {
            OutputFormat::Json => {
                json!({"event": "notification", "data": notification}).to_string()
            },
            OutputFormat::Text => {
                let marker = match notification.kind {
                    NotificationKind::Info => "i",
                    NotificationKind::Success => "+",
                    NotificationKind::Warning => "!",
                    NotificationKind::Error => "x",
                };
                format!("{} {}", marker, notification.message)
            },
        }
    }

    pub fn selection(&self, selection: &ElementSelection) -> String {
        match self.format {
            OutputFormat::Json => json!({"event": "selection", "data": selection}).to_string(),
            OutputFormat::Text => {
                let user = if selection.user.is_empty() {
                    "Anonymous"
                } else {
                    selection.user.as_str()
                };
                format!("{} selected {}", user, selection.element_id)
            },
        }
    }
}
