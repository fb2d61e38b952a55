//! Configuration file management
//!
//! Loads `~/.twin/config.toml` and merges it with command-line overrides.
//! `twin-monitor --save-config` writes the merged settings back.
//!
//! # Configuration Format
//!
//! ```toml
//! [server]
//! url = "ws://localhost:8000/ws/sensors/"   # Real-time endpoint (ws, wss, http, https)
//! sensors = [1, 4]                           # Sensors to subscribe on start
//!
//! [connection]
//! auto_reconnect = true          # Reconnect after an unexpected close
//! max_reconnect_attempts = 5     # Consecutive failed attempts before giving up
//! reconnect_delay_ms = 1000      # Base delay, doubled per attempt
//! max_reconnect_delay_ms = 30000 # Optional cap on the doubled delay
//! connection_timeout_ms = 10000  # Per-attempt open timeout (0 = none)
//! ping_interval_ms = 0           # Keepalive ping period (0 = off)
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use twin_link::ChannelOptions;

use crate::error::{CLIError, Result};

/// Endpoint used when neither the config file nor `--url` names one.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000/ws/sensors/";

/// CLI configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CLIConfiguration {
    /// Server endpoint settings
    pub server: Option<ServerConfig>,

    /// Connection/reconnection settings
    pub connection: Option<ChannelOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Real-time endpoint URL
    pub url: Option<String>,

    /// Sensor ids to subscribe on start
    #[serde(default)]
    pub sensors: Vec<u64>,
}

/// Values given on the command line; `None` leaves the file's setting alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub sensors: Vec<u64>,
    pub no_reconnect: bool,
    pub reconnect_attempts: Option<u32>,
    pub reconnect_delay_ms: Option<u64>,
    pub ping_interval_ms: Option<u64>,
}

/// Effective monitor settings after merging file and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub url: String,
    pub sensors: Vec<u64>,
    pub options: ChannelOptions,
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    let path_str = path.to_str().unwrap_or("~/.twin/config.toml");
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new("~/.twin/config.toml"))
}

impl CLIConfiguration {
    /// Load configuration from file
    ///
    /// Returns default configuration if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CLIError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        let config: CLIConfiguration = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CLIError::ConfigurationError(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Configuration that reproduces `settings` when loaded with no flags.
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            server: Some(ServerConfig {
                url: Some(settings.url.clone()),
                sensors: settings.sensors.clone(),
            }),
            connection: Some(settings.options.clone()),
        }
    }

    /// Channel options from the `[connection]` table, or defaults.
    pub fn channel_options(&self) -> ChannelOptions {
        self.connection.clone().unwrap_or_default()
    }

    /// Merge this configuration with command-line overrides.
    ///
    /// Flags win over the file. Sensors from both sources are combined,
    /// sorted and de-duplicated.
    pub fn resolve(&self, overrides: &ConnectionOverrides) -> MonitorSettings {
        let server = self.server.clone().unwrap_or_default();
        let url = overrides
            .url
            .clone()
            .or(server.url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let mut sensors = server.sensors;
        sensors.extend(overrides.sensors.iter().copied());
        sensors.sort_unstable();
        sensors.dedup();

        let mut options = self.channel_options();
        if overrides.no_reconnect {
            options = options.with_auto_reconnect(false);
        }
        if let Some(attempts) = overrides.reconnect_attempts {
            options = options.with_max_reconnect_attempts(attempts);
        }
        if let Some(delay_ms) = overrides.reconnect_delay_ms {
            options = options.with_reconnect_delay_ms(delay_ms);
        }
        if let Some(interval_ms) = overrides.ping_interval_ms {
            options = options.with_ping_interval_ms(interval_ms);
        }

        MonitorSettings {
            url,
            sensors,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CLIConfiguration::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CLIConfiguration::default());

        let settings = config.resolve(&ConnectionOverrides::default());
        assert_eq!(settings.url, DEFAULT_SERVER_URL);
        assert!(settings.sensors.is_empty());
        assert_eq!(settings.options, ChannelOptions::default());
    }

    #[test]
    fn test_partial_connection_table_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
url = "https://twin.example.com/ws/sensors/"
sensors = [4, 1]

[connection]
reconnect_delay_ms = 250
max_reconnect_delay_ms = 8000
"#,
        )
        .unwrap();

        let config = CLIConfiguration::load(&path).unwrap();
        let options = config.channel_options();
        assert_eq!(options.reconnect_delay_ms, 250);
        assert_eq!(options.max_reconnect_delay_ms, Some(8000));
        assert!(options.auto_reconnect);
        assert_eq!(options.max_reconnect_attempts, 5);
        assert_eq!(options.connection_timeout_ms, 10_000);
    }

    #[test]
    fn test_flags_override_file() {
        let config = CLIConfiguration {
            server: Some(ServerConfig {
                url: Some("ws://file.example/ws/sensors/".into()),
                sensors: vec![4, 1],
            }),
            connection: Some(ChannelOptions::default().with_max_reconnect_attempts(9)),
        };
        let overrides = ConnectionOverrides {
            url: Some("ws://flag.example/ws/sensors/".into()),
            sensors: vec![1, 7],
            no_reconnect: true,
            reconnect_attempts: Some(2),
            reconnect_delay_ms: Some(50),
            ping_interval_ms: Some(15_000),
        };

        let settings = config.resolve(&overrides);
        assert_eq!(settings.url, "ws://flag.example/ws/sensors/");
        assert_eq!(settings.sensors, vec![1, 4, 7]);
        assert!(!settings.options.auto_reconnect);
        assert_eq!(settings.options.max_reconnect_attempts, 2);
        assert_eq!(settings.options.reconnect_delay_ms, 50);
        assert_eq!(settings.options.ping_interval_ms, 15_000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CLIConfiguration {
            server: Some(ServerConfig {
                url: Some("ws://localhost:9000/ws/sensors/".into()),
                sensors: vec![3],
            }),
            connection: Some(ChannelOptions::default().with_ping_interval_ms(30_000)),
        };

        config.save(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[server]"));
        assert!(contents.contains("[connection]"));
        assert_eq!(CLIConfiguration::load(&path).unwrap(), config);
    }

    #[test]
    fn test_saved_settings_resolve_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let file = CLIConfiguration {
            server: Some(ServerConfig {
                url: None,
                sensors: vec![2],
            }),
            connection: None,
        };
        let overrides = ConnectionOverrides {
            url: Some("wss://twin.example.com/ws/sensors/".into()),
            sensors: vec![5],
            reconnect_attempts: Some(7),
            ..Default::default()
        };
        let settings = file.resolve(&overrides);

        CLIConfiguration::from_settings(&settings).save(&path).unwrap();
        let reloaded = CLIConfiguration::load(&path).unwrap();
        assert_eq!(reloaded.resolve(&ConnectionOverrides::default()), settings);
    }

    #[test]
    fn test_invalid_toml_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nurl = ").unwrap();
        assert!(matches!(
            CLIConfiguration::load(&path),
            Err(CLIError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_expand_config_path_leaves_absolute_paths() {
        let path = Path::new("/etc/twin/config.toml");
        assert_eq!(expand_config_path(path), PathBuf::from("/etc/twin/config.toml"));
    }
}
