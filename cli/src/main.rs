//! Twin Monitor - terminal client for the digital twin real-time channel
//!
//! # Usage
//!
//! ```bash
//! # Follow two sensors
//! twin-monitor -u ws://localhost:8000/ws/sensors/ --sensor 3 --sensor 7
//!
//! # JSON lines, no reconnect
//! twin-monitor --json --no-reconnect
//!
//! # Persist the current flags to ~/.twin/config.toml
//! twin-monitor -u wss://twin.example.com/ws/sensors/ -s 3 --save-config
//! ```

use clap::Parser;

use twin_cli::{config::expand_config_path, run_monitor, CLIConfiguration, OutputFormatter, Result};

mod args;

use args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    let config = CLIConfiguration::load(&cli.config)?;
    let settings = config.resolve(&cli.overrides());
    log::debug!("Monitor settings: {:?}", settings);

    if cli.save_config {
        CLIConfiguration::from_settings(&settings).save(&cli.config)?;
        println!("Saved configuration to {}", expand_config_path(&cli.config).display());
        return Ok(());
    }

    run_monitor(settings, OutputFormatter::new(cli.output_format())).await
}
