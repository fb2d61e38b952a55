//! Ordered, time-bounded user notifications.
//!
//! [`NotificationCenter`] decouples producers (channel consumers, UI code)
//! from a single rendering surface. Entries are shown in insertion order,
//! expire on timers, and are removed in two phases: `visible` flips to
//! `false` first, then the entry is deleted after a short transition window
//! so the presentation layer can animate it out.
//!
//! Without a tokio runtime no timers run. Removed entries then stay hidden
//! until the next `show` or `remove` after their removal window, which
//! deletes them, and expiring notifications persist.
//!
//! Expiry timers are not cancelled by [`remove`](NotificationCenter::remove)
//! or [`clear_all`](NotificationCenter::clear_all); a timer for an id that is
//! gone simply does nothing.

use crate::models::{Notification, NotificationId, NotificationKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::{runtime::Handle, sync::watch};

/// Ids are unique for the whole process, across all centers.
static NEXT_NOTIFICATION_ID: AtomicU64 = AtomicU64::new(1);

/// Default auto-dismiss delay used by [`NotificationCenter::show_default`].
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Notification center timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Time between hiding a notification and deleting it, in milliseconds.
    /// Default: 300ms
    #[serde(default = "default_removal_delay_ms")]
    pub removal_delay_ms: u64,
}

fn default_removal_delay_ms() -> u64 {
    300
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            removal_delay_ms: default_removal_delay_ms(),
        }
    }
}

struct Shared {
    entries: Mutex<Vec<Notification>>,
    removal_delay: Duration,
    revision: watch::Sender<u64>,
    /// Hidden entries awaiting deletion when no runtime could schedule it
    overdue: Mutex<Vec<(NotificationId, Instant)>>,
}

impl Shared {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn delete(&self, id: NotificationId) {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|n| n.id != id);
            entries.len() != before
        };
        if removed {
            log::debug!("[notifications] Deleted notification {}", id);
            self.bump();
        }
    }

    /// Delete hidden entries whose removal window passed without a timer.
    fn sweep_overdue(&self) {
        let now = Instant::now();
        let due: Vec<NotificationId> = {
            let mut overdue = self.overdue.lock();
            let (due, pending): (Vec<_>, Vec<_>) =
                overdue.drain(..).partition(|(_, deadline)| *deadline <= now);
            *overdue = pending;
            due.into_iter().map(|(id, _)| id).collect()
        };
        for id in due {
            self.delete(id);
        }
    }
}

/// Shared notification collection. Cloning yields another handle to the
/// same collection.
#[derive(Clone)]
pub struct NotificationCenter {
    shared: Arc<Shared>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

impl NotificationCenter {
    pub fn new(config: NotificationConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(Vec::new()),
                removal_delay: Duration::from_millis(config.removal_delay_ms),
                revision,
                overdue: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Append a notification and return its id.
    ///
    /// A non-zero `duration` schedules an automatic [`remove`](Self::remove);
    /// `Duration::ZERO` keeps it until dismissed manually.
    pub fn show(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> NotificationId {
        self.shared.sweep_overdue();
        let id = NotificationId(NEXT_NOTIFICATION_ID.fetch_add(1, Ordering::Relaxed));
        let expiry = (!duration.is_zero()).then_some(duration);
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            visible: true,
            expiry,
            created_at_ms: now_ms(),
        };
        log::debug!(
            "[notifications] Showing {} notification {}: {}",
            kind,
            id,
            notification.message
        );

        self.shared.entries.lock().push(notification);
        self.shared.bump();

        if let Some(after) = expiry {
            let weak = Arc::downgrade(&self.shared);
            if !spawn_after(after, move || {
                if let Some(shared) = weak.upgrade() {
                    NotificationCenter { shared }.remove(id);
                }
            }) {
                log::warn!(
                    "[notifications] No runtime to expire notification {}; it persists",
                    id
                );
            }
        }

        id
    }

    /// [`show`](Self::show) with the default kind (`info`) and duration (5s).
    pub fn show_default(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, NotificationKind::Info, DEFAULT_NOTIFICATION_DURATION)
    }

    pub fn info(&self, message: impl Into<String>, duration: Duration) -> NotificationId {
        self.show(message, NotificationKind::Info, duration)
    }

    pub fn success(&self, message: impl Into<String>, duration: Duration) -> NotificationId {
        self.show(message, NotificationKind::Success, duration)
    }

    pub fn warning(&self, message: impl Into<String>, duration: Duration) -> NotificationId {
        self.show(message, NotificationKind::Warning, duration)
    }

    pub fn error(&self, message: impl Into<String>, duration: Duration) -> NotificationId {
        self.show(message, NotificationKind::Error, duration)
    }

    /// Dismiss a notification.
    ///
    /// Hides it immediately and deletes it after the removal window. Unknown
    /// ids and notifications already on their way out are ignored.
    ///
    /// Outside a tokio runtime the hidden entry is deleted by the first
    /// `show` or `remove` once the window has elapsed.
    pub fn remove(&self, id: NotificationId) {
        self.shared.sweep_overdue();
        let hidden = {
            let mut entries = self.shared.entries.lock();
            match entries.iter_mut().find(|n| n.id == id && n.visible) {
                Some(entry) => {
                    entry.visible = false;
                    true
                },
                None => false,
            }
        };
        if !hidden {
            return;
        }
        self.shared.bump();

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        if !spawn_after(self.shared.removal_delay, move || {
            if let Some(shared) = weak.upgrade() {
                shared.delete(id);
            }
        }) {
            let deadline = Instant::now() + self.shared.removal_delay;
            self.shared.overdue.lock().push((id, deadline));
        }
    }

    /// Empty the collection immediately, without the removal window.
    pub fn clear_all(&self) {
        let cleared = {
            let mut entries = self.shared.entries.lock();
            let had_any = !entries.is_empty();
            entries.clear();
            had_any
        };
        self.shared.overdue.lock().clear();
        if cleared {
            self.shared.bump();
        }
    }

    /// All notifications, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.shared.entries.lock().clone()
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.shared.entries.lock().iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.lock().is_empty()
    }

    /// Receiver of a revision counter bumped on every change to the collection.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("len", &self.len())
            .field("removal_delay", &self.shared.removal_delay)
            .finish()
    }
}

/// Run `f` after `delay` on the current runtime. Returns `false` when there
/// is no runtime to schedule on.
fn spawn_after(delay: Duration, f: impl FnOnce() + Send + 'static) -> bool {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                f();
            });
            true
        },
        Err(_) => false,
    }
}
