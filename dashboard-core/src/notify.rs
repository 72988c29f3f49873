//! User-visible notifications emitted by the containers and the location resolver.

use parking_lot::Mutex;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Success,
    Error,
    Loading,
    Info,
    Warning,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
            NotificationLevel::Loading => "loading",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
        }
    }
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Error, message));
    }

    fn loading(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Loading, message));
    }

    fn info(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Info, message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Warning, message));
    }
}

/// Sends notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => tracing::error!("{}", notification.message),
            NotificationLevel::Warning => tracing::warn!("{}", notification.message),
            _ => tracing::info!(level = %notification.level, "{}", notification.message),
        }
    }
}

/// Keeps every notification in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(level = %notification.level, "{}", notification.message);
        self.seen.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_keeps_order_and_filters_by_level() {
        let n = MemoryNotifier::new();
        n.info("GPS access denied.");
        n.error("Failed to fetch records: Not Found");
        n.success("Record deleted successfully");

        let all = n.notifications();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].level, NotificationLevel::Info);
        assert_eq!(
            n.messages(NotificationLevel::Error),
            vec!["Failed to fetch records: Not Found".to_string()]
        );

        n.clear();
        assert!(n.notifications().is_empty());
    }
}
