//! Notification routing.
//!
//! Fire-and-forget: the scheduler emits one notification per newly seen
//! release and never waits on, or learns about, delivery.

use tracing::{info, warn};

/// Sink for new-release notifications.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, item_name: &str, release_title: &str);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn notify(&self, item_name: &str, release_title: &str) {
        (**self).notify(item_name, release_title);
    }
}

/// Log-only sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, item_name: &str, release_title: &str) {
        info!(item = item_name, release = release_title, "new release");
    }
}

/// Desktop sink: spawns a notifier command (`notify-send` by default)
/// with the item name as summary and the release title as body.
///
/// The child is spawned and dropped; exit status is never collected.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    command: String,
}

impl DesktopNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, item_name: &str, release_title: &str) {
        info!(item = item_name, release = release_title, "new release");
        let spawned = tokio::process::Command::new(&self.command)
            .arg(format!("New: {item_name}"))
            .arg(release_title)
            .spawn();
        if let Err(e) = spawned {
            warn!("cannot spawn notifier '{}': {e}", self.command);
        }
    }
}
