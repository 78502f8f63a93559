use async_trait::async_trait;
use domains::ports::{ActivityLogRepository, NotificationRepository};
use domains::{NewActivityLog, NewNotification, Result};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_err;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, type, content, related_data) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.content)
        .bind(Json(&notification.related))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogRepository for PgActivityLog {
    async fn create(&self, entry: NewActivityLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO activity_logs (id, user_id, action, details, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(Json(&entry.details))
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
