use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::follow::{FollowEdge, FollowStatus};
use crate::domain::ports::FollowRepository;
use crate::infra::db::Db;

fn edge_from_row(row: &PgRow) -> Result<FollowEdge> {
    let status: String = row.get("status");
    let status = FollowStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown follow status: {}", status))?;
    Ok(FollowEdge {
        follower_id: row.get("follower_id"),
        following_id: row.get("following_id"),
        status,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl FollowRepository for Db {
    async fn find(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        let row = sqlx::query(
            "SELECT follower_id, following_id, status, created_at \
             FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(edge_from_row).transpose()
    }

    async fn insert_pending(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>> {
        // The (follower_id, following_id) primary key arbitrates concurrent requests.
        let row = sqlx::query(
            "INSERT INTO follows (follower_id, following_id, status) \
             VALUES ($1, $2, 'pending') \
             ON CONFLICT DO NOTHING \
             RETURNING follower_id, following_id, status, created_at",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(edge_from_row).transpose()
    }

    async fn accept(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        let row = sqlx::query(
            "UPDATE follows SET status = 'accepted' \
             WHERE follower_id = $1 AND following_id = $2 AND status = 'pending' \
             RETURNING follower_id, following_id, status, created_at",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(edge_from_row).transpose()
    }

    async fn delete_pending(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows \
             WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_incoming(
        &self,
        following_id: Uuid,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>> {
        let rows = sqlx::query(
            "SELECT follower_id, following_id, status, created_at \
             FROM follows \
             WHERE following_id = $1 AND status = $2 \
             ORDER BY created_at, follower_id",
        )
        .bind(following_id)
        .bind(status.as_db())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(edge_from_row).collect()
    }

    async fn list_touching(&self, user_id: Uuid) -> Result<Vec<FollowEdge>> {
        let rows = sqlx::query(
            "SELECT follower_id, following_id, status, created_at \
             FROM follows \
             WHERE follower_id = $1 OR following_id = $1 \
             ORDER BY created_at, follower_id, following_id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(edge_from_row).collect()
    }

    async fn delete_touching(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 OR following_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
