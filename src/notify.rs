use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// How long a notification stays visible unless dismissed
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// User-facing notification queue, shared by handle
#[derive(Debug, Clone)]
pub struct Notifier {
    active: Arc<Mutex<Vec<Notification>>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            active: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.show(message, NotificationKind::Error)
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.show(message, NotificationKind::Success)
    }

    /// Enqueue a notification that expires on its own. Returns its id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) -> String {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            kind,
            created_at: chrono::Utc::now(),
        };
        let id = notification.id.clone();

        match kind {
            NotificationKind::Error => error!("Notification: {}", notification.message),
            NotificationKind::Success => info!("Notification: {}", notification.message),
        }

        self.lock().push(notification);

        let notifier = self.clone();
        let expired = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(notifier.ttl).await;
            notifier.dismiss(&expired);
        });

        id
    }

    /// Remove a notification. Returns whether it was still active.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut active = self.lock();
        let before = active.len();
        active.retain(|n| n.id != id);
        active.len() != before
    }

    pub fn active(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notifications_expire() {
        let notifier = Notifier::new();
        notifier.error("Could not decode audio");
        notifier.success("Slides regrouped");
        assert_eq!(notifier.active().len(), 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(notifier.active().is_empty());
    }

    #[tokio::test]
    async fn test_dismiss() {
        let notifier = Notifier::new();
        let id = notifier.error("Clipboard unavailable");
        assert!(notifier.dismiss(&id));
        assert!(!notifier.dismiss(&id));
        assert!(notifier.active().is_empty());
    }
}
