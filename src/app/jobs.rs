use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::domain::job::{Job, JobView, NewJob};
use crate::domain::ports::{JobRepository, Repositories, UserRepository};
use crate::domain::user::{Role, User, UserSummary};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("only hiring users can post jobs")]
    NotHiring,
    #[error("only job seekers can apply or withdraw")]
    NotJobSeeker,
    #[error("job not found")]
    NotFound,
    #[error("not authorized to manage this job")]
    NotPoster,
    #[error("already applied to this job")]
    AlreadyApplied,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
}

#[derive(Clone)]
pub struct JobService {
    users: Arc<dyn UserRepository>,
    jobs: Arc<dyn JobRepository>,
    expiration_days: i64,
}

impl JobService {
    pub fn new(repos: &Repositories, expiration_days: i64) -> Self {
        Self {
            users: repos.users.clone(),
            jobs: repos.jobs.clone(),
            expiration_days,
        }
    }

    pub async fn create(&self, user_id: Uuid, draft: JobDraft) -> Result<JobView, JobError> {
        let poster = self.user_with_role(user_id, Role::Hiring, JobError::NotHiring).await?;

        let title = required(&draft.title, "title")?;
        let description = required(&draft.description, "description")?;
        let location = required(&draft.location, "location")?;
        let skills = draft
            .skills
            .iter()
            .map(|skill| skill.trim())
            .filter(|skill| !skill.is_empty())
            .map(str::to_string)
            .collect();

        let expires_at = self
            .expiration_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|seconds| OffsetDateTime::now_utc().checked_add(Duration::seconds(seconds)))
            .ok_or_else(|| anyhow!("job expiration of {} days is out of range", self.expiration_days))?;

        let job = self
            .jobs
            .insert(NewJob {
                title,
                description,
                location,
                salary: draft.salary.filter(|salary| !salary.trim().is_empty()),
                skills,
                posted_by: poster.id,
                expires_at,
            })
            .await?;

        self.render(job).await
    }

    /// Unexpired jobs, newest first.
    pub async fn list(&self) -> Result<Vec<JobView>, JobError> {
        let jobs = self.jobs.list_active(OffsetDateTime::now_utc()).await?;
        let mut views = Vec::with_capacity(jobs.len());
        for job in jobs {
            views.push(self.render(job).await?);
        }
        Ok(views)
    }

    pub async fn apply(&self, user_id: Uuid, job_id: Uuid) -> Result<JobView, JobError> {
        self.user_with_role(user_id, Role::JobSeeker, JobError::NotJobSeeker)
            .await?;
        self.active_job(job_id).await?;

        if !self.jobs.add_applicant(job_id, user_id).await? {
            return Err(JobError::AlreadyApplied);
        }

        let job = self.active_job(job_id).await?;
        self.render(job).await
    }

    /// Withdrawing an application that was never made is not an error.
    pub async fn withdraw(&self, user_id: Uuid, job_id: Uuid) -> Result<JobView, JobError> {
        self.user_with_role(user_id, Role::JobSeeker, JobError::NotJobSeeker)
            .await?;
        self.active_job(job_id).await?;

        self.jobs.remove_applicant(job_id, user_id).await?;

        let job = self.active_job(job_id).await?;
        self.render(job).await
    }

    pub async fn remove_applicant(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        applicant_id: Uuid,
    ) -> Result<JobView, JobError> {
        self.owned_job(user_id, job_id).await?;
        self.jobs.remove_applicant(job_id, applicant_id).await?;

        let job = self.active_job(job_id).await?;
        self.render(job).await
    }

    pub async fn applicants(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<UserSummary>, JobError> {
        let job = self.owned_job(user_id, job_id).await?;
        Ok(self.render(job).await?.applicants)
    }

    pub async fn delete(&self, user_id: Uuid, job_id: Uuid) -> Result<(), JobError> {
        self.owned_job(user_id, job_id).await?;
        if !self.jobs.delete(job_id).await? {
            return Err(JobError::NotFound);
        }
        Ok(())
    }

    /// Physically removes every job whose expiry has passed.
    pub async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let purged = self.jobs.purge_expired(now).await?;
        if purged > 0 {
            info!(purged, "expired jobs purged");
        }
        Ok(purged)
    }

    async fn user_with_role(
        &self,
        user_id: Uuid,
        role: Role,
        denied: JobError,
    ) -> Result<User, JobError> {
        match self.users.find_by_id(user_id).await? {
            Some(user) if user.role == role => Ok(user),
            _ => Err(denied),
        }
    }

    async fn active_job(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.jobs
            .find_active(job_id, OffsetDateTime::now_utc())
            .await?
            .ok_or(JobError::NotFound)
    }

    async fn owned_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Job, JobError> {
        let job = self.active_job(job_id).await?;
        if job.posted_by != user_id {
            return Err(JobError::NotPoster);
        }
        Ok(job)
    }

    async fn render(&self, job: Job) -> Result<JobView, JobError> {
        let mut ids = job.applicants.clone();
        ids.push(job.posted_by);
        let users = self.users.find_many(&ids).await?;
        let summary = |id: &Uuid| {
            users
                .iter()
                .find(|user| user.id == *id)
                .map(UserSummary::from)
        };

        Ok(JobView {
            posted_by: summary(&job.posted_by),
            applicants: job.applicants.iter().filter_map(summary).collect(),
            id: job.id,
            title: job.title,
            description: job.description,
            location: job.location,
            salary: job.salary,
            skills: job.skills,
            created_at: job.created_at,
            expires_at: job.expires_at,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, JobError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JobError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
