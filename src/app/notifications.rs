use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::domain::ports::{NotificationRepository, Repositories};
use crate::domain::user::User;

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            notifications: repos.notifications.clone(),
        }
    }

    /// Appends an inbox entry for `recipient_id` describing what `origin` did.
    ///
    /// The triggering operation has already committed by the time this runs,
    /// so a failed write is logged and dropped rather than reported.
    pub async fn emit(
        &self,
        recipient_id: Uuid,
        origin: &User,
        kind: NotificationKind,
        post_id: Option<Uuid>,
    ) {
        let notification = NewNotification {
            recipient_id,
            origin_id: Some(origin.id),
            kind,
            post_id,
            message: kind.message(&origin.name),
        };

        if let Err(err) = self.notifications.insert(notification).await {
            warn!(
                error = ?err,
                recipient_id = %recipient_id,
                origin_id = %origin.id,
                kind = kind.as_db(),
                "failed to write notification"
            );
        }
    }

    pub async fn list(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Notification>> {
        self.notifications.list_for(user_id, limit).await
    }

    pub async fn count(&self, user_id: Uuid) -> Result<i64> {
        self.notifications.count_for(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64> {
        self.notifications.clear(user_id).await
    }

    /// Drops everything the user received or triggered.
    pub async fn delete_involving(&self, user_id: Uuid) -> Result<u64> {
        self.notifications.delete_involving(user_id).await
    }
}
