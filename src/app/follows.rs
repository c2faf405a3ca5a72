//! Follow-request workflow.
//!
//! Per ordered pair (A, B) the relationship moves `no edge -> pending ->
//! accepted`; rejecting a pending request or unfollowing drops the edge. The
//! guarded transitions (`accept`, `delete_pending`) are single conditional
//! store operations, and pair uniqueness is enforced by the store, so racing
//! requests cannot produce a second edge or a double acceptance.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::app::notifications::NotificationService;
use crate::domain::follow::{Connections, FollowEdge, FollowRequest, FollowState, FollowStatus};
use crate::domain::notification::NotificationKind;
use crate::domain::ports::{FollowRepository, Repositories, UserRepository};
use crate::domain::user::{User, UserSummary};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("follow request already sent or accepted")]
    AlreadyRequested,
    #[error("follow request not found")]
    RequestNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    notifier: NotificationService,
}

impl FollowService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            follows: repos.follows.clone(),
            notifier: NotificationService::new(repos),
        }
    }

    pub async fn send_request(
        &self,
        follower_id: Uuid,
        target_id: Uuid,
    ) -> Result<FollowEdge, FollowError> {
        if follower_id == target_id {
            return Err(FollowError::SelfFollow);
        }

        let follower = self.existing_user(follower_id).await?;
        self.existing_user(target_id).await?;

        if self.follows.find(follower_id, target_id).await?.is_some() {
            return Err(FollowError::AlreadyRequested);
        }

        // A concurrent request may have landed between the lookup and here.
        let edge = self
            .follows
            .insert_pending(follower_id, target_id)
            .await?
            .ok_or(FollowError::AlreadyRequested)?;

        self.notifier
            .emit(target_id, &follower, NotificationKind::FollowRequest, None)
            .await;

        Ok(edge)
    }

    /// `user_id` accepts the pending request sent by `follower_id`.
    pub async fn accept_request(
        &self,
        user_id: Uuid,
        follower_id: Uuid,
    ) -> Result<FollowEdge, FollowError> {
        let edge = self
            .follows
            .accept(follower_id, user_id)
            .await?
            .ok_or(FollowError::RequestNotFound)?;

        match self.users.find_by_id(user_id).await? {
            Some(accepter) => {
                self.notifier
                    .emit(follower_id, &accepter, NotificationKind::FollowAccepted, None)
                    .await
            }
            None => tracing::warn!(
                user_id = %user_id,
                "accepting user vanished, skipping follow_accepted notification"
            ),
        }

        Ok(edge)
    }

    /// `user_id` turns down the pending request sent by `follower_id`.
    pub async fn reject_request(&self, user_id: Uuid, follower_id: Uuid) -> Result<(), FollowError> {
        if self.follows.delete_pending(follower_id, user_id).await? {
            Ok(())
        } else {
            Err(FollowError::RequestNotFound)
        }
    }

    /// Drops the edge in whatever state it is in. Returns whether one existed.
    pub async fn unfollow(&self, follower_id: Uuid, target_id: Uuid) -> Result<bool, FollowError> {
        Ok(self.follows.delete(follower_id, target_id).await?)
    }

    pub async fn status_of(
        &self,
        follower_id: Uuid,
        target_id: Uuid,
    ) -> Result<FollowState, FollowError> {
        let edge = self.follows.find(follower_id, target_id).await?;
        Ok(FollowState::from(edge.map(|edge| edge.status)))
    }

    /// Requests waiting on `user_id`, oldest first. Requests from accounts
    /// that no longer exist are skipped.
    pub async fn pending_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>, FollowError> {
        let edges = self
            .follows
            .list_incoming(user_id, FollowStatus::Pending)
            .await?;
        let ids: Vec<Uuid> = edges.iter().map(|edge| edge.follower_id).collect();
        let followers = self.users.find_many(&ids).await?;

        let requests = edges
            .into_iter()
            .filter_map(|edge| {
                let follower = followers.iter().find(|user| user.id == edge.follower_id)?;
                Some(FollowRequest {
                    follower: UserSummary::from(follower),
                    status: edge.status,
                    created_at: edge.created_at,
                })
            })
            .collect();

        Ok(requests)
    }

    pub async fn connections(&self, user_id: Uuid) -> Result<Connections, FollowError> {
        let edges = self.follows.list_touching(user_id).await?;
        Ok(Connections::from_edges(user_id, &edges))
    }

    async fn existing_user(&self, user_id: Uuid) -> Result<User, FollowError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(FollowError::UserNotFound)
    }
}
