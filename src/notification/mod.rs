/// Notification sink
///
/// Notifications are write-once records. There is no delivery transport:
/// persisting the record with status "sent" is the whole observable effect.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// Status written for every recorded notification
pub const SENT: &str = "sent";

/// A recorded notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Task the notification refers to, stored verbatim
    pub task_id: Option<String>,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Notification persistence capability consumed by the workflow engine
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record(&self, task_id: Option<String>, message: String) -> Result<Notification>;
}

/// SQLite-backed notification sink
#[derive(Debug, Clone)]
pub struct SqliteNotificationSink {
    pool: SqlitePool,
}

impl SqliteNotificationSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for SqliteNotificationSink {
    async fn record(&self, task_id: Option<String>, message: String) -> Result<Notification> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            message,
            status: SENT.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO notifications (id, task_id, message, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&notification.id)
        .bind(&notification.task_id)
        .bind(&notification.message)
        .bind(&notification.status)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!("🔔 Recorded notification: {}", notification.id);

        Ok(notification)
    }
}
