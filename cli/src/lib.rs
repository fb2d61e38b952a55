//! Library entry point for twin-cli components.
//!
//! Exposes the config loader, output formatter and monitor loop so tests can
//! use them without going through the binary entry point.

pub mod config;
pub mod error;
pub mod formatter;
pub mod monitor;

pub use config::{CLIConfiguration, ConnectionOverrides, MonitorSettings};
pub use error::{CLIError, Result};
pub use formatter::{OutputFormat, OutputFormatter};
pub use monitor::run_monitor;
