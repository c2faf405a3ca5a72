use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::domain::ports::NotificationRepository;
use crate::infra::db::Db;

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    let kind = NotificationKind::from_db(&kind)
        .ok_or_else(|| anyhow!("unknown notification kind: {}", kind))?;
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        origin_id: row.get("origin_id"),
        kind,
        post_id: row.get("post_id"),
        message: row.get("message"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl NotificationRepository for Db {
    async fn insert(&self, notification: NewNotification) -> Result<Notification> {
        let row = sqlx::query(
            "INSERT INTO notifications (id, recipient_id, origin_id, kind, post_id, message) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, recipient_id, origin_id, kind, post_id, message, read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(notification.origin_id)
        .bind(notification.kind.as_db())
        .bind(notification.post_id)
        .bind(notification.message)
        .fetch_one(self.pool())
        .await?;

        notification_from_row(&row)
    }

    async fn list_for(&self, recipient_id: Uuid, limit: Option<i64>) -> Result<Vec<Notification>> {
        // LIMIT NULL is "no limit" in Postgres.
        let rows = sqlx::query(
            "SELECT id, recipient_id, origin_id, kind, post_id, message, read, created_at \
             FROM notifications \
             WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn count_for(&self, recipient_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
                .bind(recipient_id)
                .fetch_one(self.pool())
                .await?;

        Ok(count)
    }

    async fn clear(&self, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1")
            .bind(recipient_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_involving(&self, user_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE recipient_id = $1 OR origin_id = $1")
                .bind(user_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected())
    }
}
