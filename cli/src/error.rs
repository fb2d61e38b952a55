//! Error types for twin-cli
//!
//! Provides user-friendly error messages for common monitor failures.

use std::fmt;
use twin_link::TwinLinkError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CLIError>;

/// Errors that can occur in the CLI
#[derive(Debug)]
pub enum CLIError {
    /// Error from twin-link library
    LinkError(TwinLinkError),

    /// Configuration file error
    ConfigurationError(String),

    /// File I/O error
    FileError(String),

    /// The channel ran out of reconnect attempts, or reconnect is disabled
    Disconnected(String),
}

impl CLIError {
    fn format_link_error(err: &TwinLinkError) -> String {
        match err {
            TwinLinkError::WebSocketError(msg) => Self::clean_nested_message(msg),
            TwinLinkError::TimeoutError(msg) => msg.clone(),
            TwinLinkError::SerializationError(msg) => msg.clone(),
            TwinLinkError::ConfigurationError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    fn clean_nested_message(message: &str) -> String {
        let mut cleaned = message.trim();
        let prefixes = ["Connection failed:", "connection failed:", "WebSocket error:"];

        loop {
            let mut stripped = false;
            for prefix in &prefixes {
                if let Some(rest) = cleaned.strip_prefix(prefix) {
                    cleaned = rest.trim_start();
                    stripped = true;
                    break;
                }
            }

            if !stripped {
                break;
            }
        }

        cleaned.to_string()
    }
}

impl fmt::Display for CLIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLIError::LinkError(e) => write!(f, "{}", Self::format_link_error(e)),
            CLIError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CLIError::FileError(msg) => write!(f, "File error: {}", msg),
            CLIError::Disconnected(msg) => write!(f, "Disconnected: {}", msg),
        }
    }
}

impl std::error::Error for CLIError {}

impl From<TwinLinkError> for CLIError {
    fn from(err: TwinLinkError) -> Self {
        CLIError::LinkError(err)
    }
}

impl From<std::io::Error> for CLIError {
    fn from(err: std::io::Error) -> Self {
        CLIError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for CLIError {
    fn from(err: toml::de::Error) -> Self {
        CLIError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CLIError::ConfigurationError("missing url".into());
        assert_eq!(err.to_string(), "Configuration error: missing url");

        let err = CLIError::Disconnected("gave up".into());
        assert_eq!(err.to_string(), "Disconnected: gave up");
    }

    #[test]
    fn test_link_error_prefixes_are_stripped() {
        let err: CLIError = TwinLinkError::WebSocketError(
            "Connection failed: connection failed: IO error: refused".into(),
        )
        .into();
        assert_eq!(err.to_string(), "IO error: refused");

        let err: CLIError = TwinLinkError::ChannelClosed.into();
        assert_eq!(err.to_string(), "Channel is closed");
    }
}
