use async_trait::async_trait;
use domains::ports::{ActivityLogRepository, NotificationRepository};
use domains::{NewActivityLog, NewNotification, Result, UserId};
use tokio::sync::RwLock;

/// Records notifications instead of delivering them.
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    sent: RwLock<Vec<NewNotification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<NewNotification> {
        self.sent.read().await.clone()
    }

    pub async fn for_user(&self, user_id: UserId) -> Vec<NewNotification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<()> {
        tracing::debug!(
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            "notification stored"
        );
        self.sent.write().await.push(notification);
        Ok(())
    }
}

/// Append-only audit trail.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<NewActivityLog>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<NewActivityLog> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryActivityLog {
    async fn create(&self, entry: NewActivityLog) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
