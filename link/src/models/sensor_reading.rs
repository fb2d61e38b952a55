use serde::{Deserialize, Deserializer, Serialize};

/// A single sensor sample pushed by the server in a `sensor_update` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: u64,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub unit: Option<String>,

    /// ISO-8601 sample time as sent by the server
    #[serde(default)]
    pub timestamp: Option<String>,

    /// Data quality percentage (0-100). Missing or `null` means 100.
    #[serde(default = "default_quality", deserialize_with = "quality_or_default")]
    pub quality: f64,
}

fn default_quality() -> f64 {
    100.0
}

fn quality_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_quality))
}

impl SensorReading {
    /// Format the value with its unit, e.g. `"21.5 °C"`.
    pub fn display_value(&self) -> String {
        match (self.value, self.unit.as_deref()) {
            (Some(v), Some(unit)) if !unit.is_empty() => format!("{} {}", v, unit),
            (Some(v), _) => v.to_string(),
            (None, _) => "n/a".to_string(),
        }
    }
}
