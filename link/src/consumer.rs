//! Sensor dashboard: a channel consumer that turns real-time messages into
//! dashboard state and user notifications.
//!
//! The dashboard owns a [`ReconnectingChannel`] whose handlers:
//!
//! - fold `sensor_update`, `alert`, `subscribed`, `pong` and
//!   `element_selected` messages into [`DashboardState`]
//! - raise [`NotificationCenter`] entries for connect, disconnect, give-up,
//!   transport errors, server errors and alerts
//! - re-send every sensor subscription after each (re)connect
//! - publish [`DashboardEvent`]s for live views

use crate::{
    channel::{ChannelState, ReconnectingChannel},
    error::Result,
    event_handlers::{ChannelError, CloseReason, EventHandlers},
    models::{
        ChannelOptions, ClientMessage, ElementSelection, NotificationKind, SensorAlert,
        SensorReading, ServerMessage,
    },
    notifications::NotificationCenter,
    transport::Transport,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{Arc, OnceLock, Weak},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::broadcast;

/// Number of recent alerts kept in [`DashboardState::alerts`].
pub const MAX_RECENT_ALERTS: usize = 50;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const CONNECTED_NOTICE: Duration = Duration::from_millis(3000);
const WARNING_NOTICE: Duration = Duration::from_millis(5000);
const ALERT_NOTICE: Duration = Duration::from_millis(8000);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Derived view of everything the dashboard has learned from the channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    pub online: bool,
    /// Latest reading per sensor id.
    pub readings: BTreeMap<u64, SensorReading>,
    /// Most recent alerts, oldest first, capped at [`MAX_RECENT_ALERTS`].
    pub alerts: VecDeque<SensorAlert>,
    /// Sensors the server has confirmed on the current connection.
    pub subscribed: BTreeSet<u64>,
    /// Sensors requested by the user; re-sent after every reconnect.
    pub requested: BTreeSet<u64>,
    pub last_selection: Option<ElementSelection>,
    /// Round-trip time of the last answered ping.
    pub last_latency_ms: Option<u64>,
    pub messages_received: u64,
    pub decode_errors: u64,
}

/// Live update published by the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Online,
    Offline { reason: CloseReason, state: ChannelState },
    Reading(SensorReading),
    Alert(SensorAlert),
    Selection(ElementSelection),
    /// A message with a type the dashboard does not interpret.
    Other(JsonValue),
}

struct DashboardShared {
    state: Mutex<DashboardState>,
    notifications: NotificationCenter,
    channel: OnceLock<Weak<ReconnectingChannel>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardShared {
    fn channel(&self) -> Option<Arc<ReconnectingChannel>> {
        self.channel.get().and_then(Weak::upgrade)
    }

    fn publish(&self, event: DashboardEvent) {
        // No live view subscribed is fine.
        let _ = self.events.send(event);
    }

    fn on_open(&self) {
        let requested: Vec<u64> = {
            let mut state = self.state.lock();
            state.online = true;
            state.subscribed.clear();
            state.requested.iter().copied().collect()
        };
        self.notifications
            .success("Connected to real-time monitoring", CONNECTED_NOTICE);
        self.publish(DashboardEvent::Online);

        if let Some(channel) = self.channel() {
            for sensor_id in requested {
                if !channel.send(&ClientMessage::SubscribeSensor { sensor_id }) {
                    log::warn!("[dashboard] Failed to re-subscribe sensor {}", sensor_id);
                }
            }
        }
    }

    fn on_close(&self, reason: CloseReason) {
        let was_online = {
            let mut state = self.state.lock();
            let was_online = state.online;
            state.online = false;
            state.subscribed.clear();
            was_online
        };

        let channel = self.channel();
        let channel_state = channel
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ChannelState::Closed);

        match channel_state {
            ChannelState::Reconnecting if was_online => {
                self.notifications
                    .warning("Connection lost, reconnecting…", WARNING_NOTICE);
            },
            ChannelState::Disconnected => {
                let gave_up = channel
                    .as_ref()
                    .map(|c| c.options().auto_reconnect)
                    .unwrap_or(false);
                let message = if gave_up {
                    let attempts = channel
                        .as_ref()
                        .map(|c| c.options().max_reconnect_attempts)
                        .unwrap_or_default();
                    format!(
                        "Unable to reach the real-time server after {} attempts",
                        attempts
                    )
                } else {
                    "Disconnected from real-time monitoring".to_string()
                };
                self.notifications
                    .show(message, NotificationKind::Error, Duration::ZERO);
            },
            _ => {},
        }

        self.publish(DashboardEvent::Offline {
            reason,
            state: channel_state,
        });
    }

    fn on_error(&self, error: ChannelError) {
        if error.is_decode() {
            self.state.lock().decode_errors += 1;
            log::warn!("[dashboard] Ignoring undecodable frame: {}", error.message);
            return;
        }

        let online = self.state.lock().online;
        if online || !error.recoverable {
            self.notifications
                .error(format!("Connection error: {}", error.message), WARNING_NOTICE);
        } else {
            log::info!("[dashboard] {}", error);
        }
    }

    fn on_message(&self, message: JsonValue) {
        self.state.lock().messages_received += 1;

        let Some(parsed) = ServerMessage::from_value(&message) else {
            self.publish(DashboardEvent::Other(message));
            return;
        };

        match parsed {
            ServerMessage::Connection { message } => {
                log::info!("[dashboard] Server: {}", message);
            },
            ServerMessage::Pong { timestamp } => {
                if let Some(sent) = timestamp {
                    self.state.lock().last_latency_ms = Some(now_ms().saturating_sub(sent));
                }
            },
            ServerMessage::Subscribed { sensor_id } => {
                if let Some(id) = sensor_id {
                    self.state.lock().subscribed.insert(id);
                }
            },
            ServerMessage::SensorUpdate { data } => {
                self.state.lock().readings.insert(data.sensor_id, data.clone());
                self.publish(DashboardEvent::Reading(data));
            },
            ServerMessage::Alert { data } => {
                {
                    let mut state = self.state.lock();
                    state.alerts.push_back(data.clone());
                    while state.alerts.len() > MAX_RECENT_ALERTS {
                        state.alerts.pop_front();
                    }
                }
                let kind = data.notification_kind();
                let duration = if kind == NotificationKind::Error {
                    Duration::ZERO
                } else {
                    ALERT_NOTICE
                };
                self.notifications.show(data.display_message(), kind, duration);
                self.publish(DashboardEvent::Alert(data));
            },
            ServerMessage::ElementSelected { element_id, user } => {
                let selection = ElementSelection { element_id, user };
                self.state.lock().last_selection = Some(selection.clone());
                self.publish(DashboardEvent::Selection(selection));
            },
            ServerMessage::Error { message } => {
                self.notifications
                    .error(format!("Server error: {}", message), WARNING_NOTICE);
            },
        }
    }
}

/// Sensor dashboard bound to one real-time endpoint.
pub struct SensorDashboard {
    channel: Arc<ReconnectingChannel>,
    shared: Arc<DashboardShared>,
}

impl SensorDashboard {
    /// Attach a dashboard to `endpoint` over WebSocket. Does not connect.
    pub fn attach(
        endpoint: impl Into<String>,
        options: ChannelOptions,
        notifications: NotificationCenter,
    ) -> Result<Self> {
        Self::build(endpoint.into(), options, notifications, None)
    }

    /// Attach a dashboard using a custom transport.
    pub fn attach_with_transport(
        endpoint: impl Into<String>,
        options: ChannelOptions,
        notifications: NotificationCenter,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Self::build(endpoint.into(), options, notifications, Some(transport))
    }

    fn build(
        endpoint: String,
        options: ChannelOptions,
        notifications: NotificationCenter,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(DashboardShared {
            state: Mutex::new(DashboardState::default()),
            notifications,
            channel: OnceLock::new(),
            events,
        });

        let (on_open, on_close, on_error, on_message) =
            (shared.clone(), shared.clone(), shared.clone(), shared.clone());
        let handlers = EventHandlers::new()
            .on_open(move || on_open.on_open())
            .on_close(move |reason| on_close.on_close(reason))
            .on_error(move |error| on_error.on_error(error))
            .on_message(move |message| on_message.on_message(message));

        let mut builder = ReconnectingChannel::builder()
            .endpoint(endpoint)
            .options(options)
            .event_handlers(handlers);
        if let Some(transport) = transport {
            builder = builder.transport(transport);
        }

        let channel = Arc::new(builder.build()?);
        let _ = shared.channel.set(Arc::downgrade(&channel));

        Ok(Self { channel, shared })
    }

    pub fn connect(&self) -> Result<()> {
        self.channel.connect()
    }

    pub fn close(&self) {
        self.channel.close();
    }

    /// Request live updates for a sensor.
    ///
    /// The request is remembered and re-sent after every reconnect; the
    /// return value says whether it went out on the current connection.
    pub fn subscribe_sensor(&self, sensor_id: u64) -> bool {
        self.shared.state.lock().requested.insert(sensor_id);
        self.channel.send(&ClientMessage::SubscribeSensor { sensor_id })
    }

    /// Share a 3D element selection with the other viewers.
    pub fn select_element(&self, element_id: impl Into<String>) -> bool {
        self.channel.send(&ClientMessage::ElementSelected {
            element_id: element_id.into(),
        })
    }

    /// Send a latency probe; the reply updates `last_latency_ms`.
    pub fn ping(&self) -> bool {
        self.channel.send(&ClientMessage::Ping { timestamp: now_ms() })
    }

    /// Snapshot of the dashboard state.
    pub fn state(&self) -> DashboardState {
        self.shared.state.lock().clone()
    }

    /// Subscribe to live dashboard events.
    pub fn events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.shared.events.subscribe()
    }

    pub fn channel(&self) -> &ReconnectingChannel {
        &self.channel
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.shared.notifications
    }
}

impl std::fmt::Debug for SensorDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorDashboard")
            .field("channel", &self.channel)
            .field("online", &self.shared.state.lock().online)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detached_dashboard() -> SensorDashboard {
        SensorDashboard::attach(
            "ws://localhost:9/ws/sensors/",
            ChannelOptions::default(),
            NotificationCenter::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_sensor_update_updates_latest_reading() {
        let dashboard = detached_dashboard();
        let mut events = dashboard.events();

        dashboard.shared.on_message(json!({
            "type": "sensor_update",
            "data": {"sensor_id": 5, "value": 1.0, "unit": "bar"}
        }));
        dashboard.shared.on_message(json!({
            "type": "sensor_update",
            "data": {"sensor_id": 5, "value": 1.4, "unit": "bar"}
        }));

        let state = dashboard.state();
        assert_eq!(state.messages_received, 2);
        assert_eq!(state.readings[&5].value, Some(1.4));
        assert!(matches!(events.try_recv(), Ok(DashboardEvent::Reading(_))));
    }

    #[test]
    fn test_persistent_alert_notification_for_critical_severity() {
        let dashboard = detached_dashboard();
        dashboard.shared.on_message(json!({
            "type": "alert",
            "data": {"id": 1, "sensor_id": 5, "sensor_name": "Pump P2",
                     "message": "Pressure drop", "severity": "critical"}
        }));

        let notes = dashboard.notifications().snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert_eq!(notes[0].message, "Pump P2: Pressure drop");
        assert_eq!(notes[0].expiry, None);
        assert_eq!(dashboard.state().alerts.len(), 1);
    }

    #[test]
    fn test_alert_history_is_capped() {
        let dashboard = detached_dashboard();
        for id in 0..(MAX_RECENT_ALERTS as u64 + 5) {
            dashboard.shared.on_message(json!({
                "type": "alert",
                "data": {"id": id, "sensor_id": 1, "message": "x", "severity": "critical"}
            }));
        }
        let state = dashboard.state();
        assert_eq!(state.alerts.len(), MAX_RECENT_ALERTS);
        assert_eq!(state.alerts.front().map(|a| a.id), Some(5));
    }

    #[test]
    fn test_unknown_messages_are_forwarded() {
        let dashboard = detached_dashboard();
        let mut events = dashboard.events();
        dashboard.shared.on_message(json!({"type": "weather", "temp": 3}));
        match events.try_recv() {
            Ok(DashboardEvent::Other(value)) => assert_eq!(value["temp"], 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_errors_are_counted_not_shown() {
        let dashboard = detached_dashboard();
        dashboard.shared.on_error(ChannelError::decode("bad"));
        assert_eq!(dashboard.state().decode_errors, 1);
        assert!(dashboard.notifications().is_empty());
    }

    #[test]
    fn test_subscribe_while_offline_is_remembered() {
        let dashboard = detached_dashboard();
        assert!(!dashboard.subscribe_sensor(42));
        assert!(dashboard.state().requested.contains(&42));
    }
}
