use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::job::{Job, NewJob};
use crate::domain::ports::JobRepository;
use crate::infra::db::Db;

const JOB_SELECT: &str = "SELECT j.id, j.title, j.description, j.location, j.salary, j.skills, \
            j.posted_by, j.created_at, j.expires_at, \
            COALESCE( \
                ARRAY_AGG(a.user_id ORDER BY a.applied_at) FILTER (WHERE a.user_id IS NOT NULL), \
                '{}' \
            ) AS applicants \
     FROM jobs j \
     LEFT JOIN job_applications a ON a.job_id = j.id";

fn job_from_row(row: &PgRow) -> Job {
    Job {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        salary: row.get("salary"),
        skills: row.get("skills"),
        posted_by: row.get("posted_by"),
        applicants: row.get("applicants"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait]
impl JobRepository for Db {
    async fn insert(&self, job: NewJob) -> Result<Job> {
        let row = sqlx::query(
            "INSERT INTO jobs (id, title, description, location, salary, skills, posted_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, title, description, location, salary, skills, posted_by, \
                       created_at, expires_at, '{}'::uuid[] AS applicants",
        )
        .bind(Uuid::new_v4())
        .bind(job.title)
        .bind(job.description)
        .bind(job.location)
        .bind(job.salary)
        .bind(job.skills)
        .bind(job.posted_by)
        .bind(job.expires_at)
        .fetch_one(self.pool())
        .await?;

        Ok(job_from_row(&row))
    }

    async fn find_active(&self, job_id: Uuid, now: OffsetDateTime) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "{JOB_SELECT} WHERE j.id = $1 AND j.expires_at > $2 GROUP BY j.id"
        ))
        .bind(job_id)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(job_from_row))
    }

    async fn list_active(&self, now: OffsetDateTime) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "{JOB_SELECT} WHERE j.expires_at > $1 GROUP BY j.id ORDER BY j.created_at DESC, j.id DESC"
        ))
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(job_from_row).collect())
    }

    async fn add_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO job_applications (job_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(job_id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM job_applications WHERE job_id = $1 AND user_id = $2")
            .bind(job_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, job_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM job_applications WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM jobs WHERE posted_by = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
