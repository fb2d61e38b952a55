//! Terminal sensor monitor.
//!
//! Drives a [`SensorDashboard`] and prints new notifications, sensor readings
//! and element selections until Ctrl-C or until the channel gives up.

use std::collections::HashSet;
use tokio::sync::broadcast::error::RecvError;
use twin_link::{
    ChannelState, DashboardEvent, NotificationCenter, NotificationId, SensorDashboard,
};

use crate::{
    config::MonitorSettings,
    error::{CLIError, Result},
    formatter::OutputFormatter,
};

/// Prints each notification once, the first time it is seen visible.
#[derive(Debug, Default)]
struct NotificationPrinter {
    printed: HashSet<NotificationId>,
}

impl NotificationPrinter {
    fn flush(&mut self, center: &NotificationCenter, formatter: &OutputFormatter) {
        let snapshot = center.snapshot();
        for notification in snapshot.iter().filter(|n| n.visible) {
            if self.printed.insert(notification.id) {
                println!("{}", formatter.notification(notification));
            }
        }
        self.printed
            .retain(|id| snapshot.iter().any(|n| n.id == *id));
    }
}

/// Run the monitor until interrupted.
///
/// Returns [`CLIError::Disconnected`] when the channel stops retrying.
pub async fn run_monitor(settings: MonitorSettings, formatter: OutputFormatter) -> Result<()> {
    let notifications = NotificationCenter::default();
    let dashboard =
        SensorDashboard::attach(settings.url, settings.options, notifications.clone())?;
    let mut events = dashboard.events();
    let mut revisions = notifications.watch();
    let mut printer = NotificationPrinter::default();

    log::info!("Connecting to {}", dashboard.channel().endpoint());
    dashboard.connect()?;
    for sensor_id in &settings.sensors {
        // Sent on open; remembered until then.
        dashboard.subscribe_sensor(*sensor_id);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Interrupted, closing channel");
                break Ok(());
            }

            changed = revisions.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                printer.flush(&notifications, &formatter);
            }

            event = events.recv() => match event {
                Ok(DashboardEvent::Reading(reading)) => println!("{}", formatter.reading(&reading)),
                Ok(DashboardEvent::Selection(selection)) => {
                    println!("{}", formatter.selection(&selection))
                },
                Ok(DashboardEvent::Offline { reason, state }) => {
                    log::debug!("Channel offline ({}): {}", state, reason);
                    if state == ChannelState::Disconnected {
                        printer.flush(&notifications, &formatter);
                        break Err(CLIError::Disconnected(reason.to_string()));
                    }
                },
                Ok(DashboardEvent::Other(value)) => log::debug!("Unhandled message: {}", value),
                Ok(DashboardEvent::Online) | Ok(DashboardEvent::Alert(_)) => {},
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Output fell behind, skipped {} events", skipped);
                },
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    dashboard.close();
    let state = dashboard.state();
    log::info!(
        "Monitor stopped after {} messages ({} undecodable)",
        state.messages_received,
        state.decode_errors
    );
    outcome
}
