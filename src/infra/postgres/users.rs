use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::ports::{UserRepository, UserWrite};
use crate::domain::user::{NewUser, Role, User};
use crate::infra::db::{is_unique_violation, Db};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar, created_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = Role::from_db(&role).ok_or_else(|| anyhow!("unknown user role: {}", role))?;
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl UserRepository for Db {
    async fn ping(&self) -> Result<()> {
        Db::ping(self).await
    }

    async fn insert(&self, user: NewUser) -> Result<UserWrite> {
        let result = sqlx::query(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, avatar) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_db())
        .bind(user.avatar)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(row) => Ok(UserWrite::Saved(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err, "users_email_key") => Ok(UserWrite::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn update(&self, user: &User) -> Result<UserWrite> {
        let result = sqlx::query(&format!(
            "UPDATE users \
             SET name = $2, email = $3, password_hash = $4, role = $5, avatar = $6 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_db())
        .bind(&user.avatar)
        .fetch_optional(self.pool())
        .await;

        match result {
            Ok(Some(row)) => Ok(UserWrite::Saved(user_from_row(&row)?)),
            Ok(None) => Ok(UserWrite::Missing),
            Err(err) if is_unique_violation(&err, "users_email_key") => Ok(UserWrite::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
