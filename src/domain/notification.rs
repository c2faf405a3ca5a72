use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub origin_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub message: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    FollowRequest,
    FollowAccepted,
}

impl NotificationKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "follow_request" => Some(Self::FollowRequest),
            "follow_accepted" => Some(Self::FollowAccepted),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::FollowRequest => "follow_request",
            Self::FollowAccepted => "follow_accepted",
        }
    }

    /// Inbox text for an event triggered by `origin_name`.
    pub fn message(&self, origin_name: &str) -> String {
        match self {
            Self::Like => format!("{} liked your post", origin_name),
            Self::FollowRequest => format!("{} sent you a follow request", origin_name),
            Self::FollowAccepted => format!("{} accepted your follow request", origin_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub origin_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub message: String,
}
