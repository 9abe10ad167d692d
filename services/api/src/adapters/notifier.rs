//! services/api/src/adapters/notifier.rs
//!
//! An in-memory `NotificationSink`. Each notification is kept until the
//! recipient dismisses it or its time-to-live runs out.

use async_trait::async_trait;
use attendance_core::domain::{Notification, Severity};
use attendance_core::ports::{Clock, NotificationSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone)]
pub struct InMemoryNotifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    next_id: AtomicU64,
    items: Mutex<Vec<Notification>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryNotifier {
    /// A zero `ttl` keeps notifications until they are dismissed.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                next_id: AtomicU64::new(1),
                items: Mutex::new(Vec::new()),
                ttl,
                clock,
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotifier {
    async fn notify(&self, recipient: &str, message: &str, severity: Severity) -> Notification {
        let notification = Notification {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            recipient: recipient.to_string(),
            message: message.to_string(),
            severity,
            created_at: self.inner.clock.now(),
        };
        info!(
            "[{}] -> {}: {}",
            severity.as_str(),
            recipient,
            notification.message
        );
        self.inner.items.lock().await.push(notification.clone());

        if !self.inner.ttl.is_zero() {
            let inner = self.inner.clone();
            let id = notification.id;
            tokio::spawn(async move {
                tokio::time::sleep(inner.ttl).await;
                let mut items = inner.items.lock().await;
                let before = items.len();
                items.retain(|n| n.id != id);
                if items.len() != before {
                    debug!("Notification {} expired", id);
                }
            });
        }

        notification
    }

    async fn list_for(&self, recipient: &str) -> Vec<Notification> {
        self.inner
            .items
            .lock()
            .await
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    async fn dismiss(&self, recipient: &str, notification_id: u64) -> bool {
        let mut items = self.inner.items.lock().await;
        let before = items.len();
        items.retain(|n| !(n.id == notification_id && n.recipient == recipient));
        items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SystemClock;

    fn notifier(ttl: Duration) -> InMemoryNotifier {
        InMemoryNotifier::new(ttl, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_their_recipient() {
        let sink = notifier(Duration::ZERO);

        sink.notify("user-1", "hello", Severity::Info).await;
        sink.notify("user-2", "other", Severity::Warning).await;

        let mine = sink.list_for("user-1").await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].message, "hello");
        assert_eq!(mine[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn dismiss_only_removes_own_notification() {
        let sink = notifier(Duration::ZERO);
        let n = sink.notify("user-1", "hello", Severity::Success).await;

        assert!(!sink.dismiss("user-2", n.id).await);
        assert!(sink.dismiss("user-1", n.id).await);
        assert!(!sink.dismiss("user-1", n.id).await);
        assert!(sink.list_for("user-1").await.is_empty());
    }

    #[tokio::test]
    async fn notifications_expire_after_ttl() {
        let sink = notifier(Duration::from_millis(20));
        sink.notify("user-1", "short lived", Severity::Info).await;
        assert_eq!(sink.list_for("user-1").await.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(sink.list_for("user-1").await.is_empty());
    }
}
