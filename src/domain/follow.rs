use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::UserSummary;

/// Directed edge `follower -> following`. At most one exists per ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub status: FollowStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    Pending,
    Accepted,
}

impl FollowStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

/// Relationship of one user to another as seen from the follower's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    NotFollowing,
    Pending,
    Accepted,
}

impl From<Option<FollowStatus>> for FollowState {
    fn from(status: Option<FollowStatus>) -> Self {
        match status {
            None => Self::NotFollowing,
            Some(FollowStatus::Pending) => Self::Pending,
            Some(FollowStatus::Accepted) => Self::Accepted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowRequest {
    pub follower: UserSummary,
    pub status: FollowStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Follower/following/pending id lists for one user, rebuilt from the edges
/// touching that user on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Connections {
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub pending_requests: Vec<Uuid>,
}

impl Connections {
    pub fn from_edges(user_id: Uuid, edges: &[FollowEdge]) -> Self {
        let mut connections = Self::default();
        for edge in edges {
            match edge.status {
                FollowStatus::Accepted if edge.following_id == user_id => {
                    connections.followers.push(edge.follower_id)
                }
                FollowStatus::Accepted if edge.follower_id == user_id => {
                    connections.following.push(edge.following_id)
                }
                FollowStatus::Pending if edge.following_id == user_id => {
                    connections.pending_requests.push(edge.follower_id)
                }
                _ => {}
            }
        }
        connections
    }
}
