use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What an account is on the board for. Drives the job board permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    JobSeeker,
    Hiring,
}

impl Role {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "job_seeker" => Some(Self::JobSeeker),
            "hiring" => Some(Self::Hiring),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::JobSeeker => "job_seeker",
            Self::Hiring => "hiring",
        }
    }
}

/// Account fields accepted at registration, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            created_at: user.created_at,
        }
    }
}

/// Compact author/follower/applicant card embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }
}

/// Lowercases and trims an address so lookups and the uniqueness check agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_db_names() {
        for role in [Role::JobSeeker, Role::Hiring] {
            assert_eq!(Role::from_db(role.as_db()), Some(role));
        }
        assert_eq!(Role::from_db("recruiter"), None);
    }

    #[test]
    fn role_serializes_snake_case() {
        let value = serde_json::to_value(Role::JobSeeker).unwrap();
        assert_eq!(value, "job_seeker");
        let parsed: Role = serde_json::from_value(serde_json::json!("hiring")).unwrap();
        assert_eq!(parsed, Role::Hiring);
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
