use clap::Parser;
use std::path::PathBuf;
use twin_cli::{ConnectionOverrides, OutputFormat};

/// Twin Monitor - terminal view of the digital twin's real-time sensor feed
#[derive(Parser, Debug)]
#[command(name = "twin-monitor")]
#[command(author = "Twin Monitoring Team")]
#[command(version)]
#[command(about = "Follow live sensor updates and alerts from the digital twin", long_about = None)]
pub struct Cli {
    /// Real-time endpoint (e.g., ws://localhost:8000/ws/sensors/)
    #[arg(short = 'u', long = "url")]
    pub url: Option<String>,

    /// Configuration file path
    #[arg(long = "config", default_value = "~/.twin/config.toml")]
    pub config: PathBuf,

    /// Sensor id to subscribe to (repeatable)
    #[arg(short = 's', long = "sensor", value_name = "ID")]
    pub sensors: Vec<u64>,

    /// Do not reconnect after the connection drops
    #[arg(long = "no-reconnect")]
    pub no_reconnect: bool,

    /// Consecutive reconnect attempts before giving up
    #[arg(long = "reconnect-attempts", value_name = "N")]
    pub reconnect_attempts: Option<u32>,

    /// Base reconnect delay in milliseconds, doubled per attempt
    #[arg(long = "reconnect-delay-ms", value_name = "MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// Keepalive ping interval in milliseconds (0 = off)
    #[arg(long = "ping-interval-ms", value_name = "MS")]
    pub ping_interval_ms: Option<u64>,

    /// Write the effective settings to the config file and exit
    #[arg(long = "save-config")]
    pub save_config: bool,

    /// Print one JSON object per line
    #[arg(long = "json")]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            url: self.url.clone(),
            sensors: self.sensors.clone(),
            no_reconnect: self.no_reconnect,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay_ms: self.reconnect_delay_ms,
            ping_interval_ms: self.ping_interval_ms,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}
