use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// How loudly a notification should be surfaced by the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Destructive,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Destructive => "destructive",
        }
    }
}

/// Payload handed to the notification collaborator (toasts, e-mail, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

/// Outbound hook for user-facing messages raised by the engine.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Forwards notifications to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(
                title = %notification.title,
                "{}",
                notification.description
            ),
            Severity::Warning | Severity::Destructive => tracing::warn!(
                title = %notification.title,
                severity = notification.severity.label(),
                "{}",
                notification.description
            ),
        }
    }
}

/// Collects notifications so callers can render or assert on them later.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn drain(&self) -> Vec<Notification> {
        let mut guard = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
    }
}
