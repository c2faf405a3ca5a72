use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub posted_by: Uuid,
    pub applicants: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Job {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub posted_by: Uuid,
    pub expires_at: OffsetDateTime,
}

/// Job listing with the poster and applicants resolved to user cards.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub posted_by: Option<UserSummary>,
    pub applicants: Vec<UserSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
