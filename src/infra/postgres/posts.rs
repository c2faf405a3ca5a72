use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::ports::PostRepository;
use crate::domain::post::Post;
use crate::infra::db::Db;

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        image: row.get("image"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl PostRepository for Db {
    async fn insert(
        &self,
        author_id: Uuid,
        content: String,
        image: Option<String>,
    ) -> Result<Post> {
        let row = sqlx::query(
            "INSERT INTO posts (id, author_id, content, image) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, author_id, content, image, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(content)
        .bind(image)
        .fetch_one(self.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, author_id, content, image, created_at FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, author_id, content, image, created_at \
             FROM posts \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, author_id, content, image, created_at \
             FROM posts \
             WHERE author_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(author_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        // likes.post_id cascades.
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_author(&self, author_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE author_id = $1")
            .bind(author_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.pool())
        .await?;

        Ok(liked)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }

    async fn delete_likes_by_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
