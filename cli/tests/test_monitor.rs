//! End-to-end checks of the monitor loop against local endpoints.

use std::time::Duration;
use tokio::net::TcpListener;
use twin_cli::{
    run_monitor, CLIConfiguration, CLIError, ConnectionOverrides, OutputFormat, OutputFormatter,
};

#[tokio::test]
async fn test_monitor_exits_when_server_is_unreachable() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let overrides = ConnectionOverrides {
        url: Some(format!("ws://{}/ws/sensors/", addr)),
        sensors: vec![1],
        reconnect_attempts: Some(1),
        reconnect_delay_ms: Some(10),
        ..Default::default()
    };
    let settings = CLIConfiguration::default().resolve(&overrides);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        run_monitor(settings, OutputFormatter::new(OutputFormat::Json)),
    )
    .await
    .expect("monitor should give up well before the timeout");

    assert!(matches!(result, Err(CLIError::Disconnected(_))));
}

#[tokio::test]
async fn test_monitor_rejects_invalid_endpoint() {
    let overrides = ConnectionOverrides {
        url: Some("ftp://example.com/feed".into()),
        ..Default::default()
    };
    let settings = CLIConfiguration::default().resolve(&overrides);

    let result = run_monitor(settings, OutputFormatter::default()).await;
    assert!(matches!(result, Err(CLIError::LinkError(_))));
}
