//! Storage ports. Services only ever talk to these traits; `infra::postgres`
//! and `infra::memory` provide the adapters.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::follow::{FollowEdge, FollowStatus};
use crate::domain::job::{Job, NewJob};
use crate::domain::notification::{NewNotification, Notification};
use crate::domain::post::Post;
use crate::domain::user::{NewUser, User};

/// Result of writing an account record.
#[derive(Debug, Clone)]
pub enum UserWrite {
    Saved(User),
    EmailTaken,
    Missing,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Round-trips the backing store.
    async fn ping(&self) -> Result<()>;

    async fn insert(&self, user: NewUser) -> Result<UserWrite>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<User>>;

    /// Overwrites the mutable fields of an existing account.
    async fn update(&self, user: &User) -> Result<UserWrite>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn find(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>>;

    /// Creates a pending edge. Returns `None` when an edge for the ordered
    /// pair already exists, in any status.
    async fn insert_pending(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>>;

    /// Moves a pending edge to accepted. `None` if no pending edge exists.
    async fn accept(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>>;

    /// Deletes the edge only while it is still pending.
    async fn delete_pending(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Deletes the edge whatever its status.
    async fn delete(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Edges pointing at `following_id` with the given status, oldest first.
    async fn list_incoming(
        &self,
        following_id: Uuid,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>>;

    /// Every edge where the user is either endpoint.
    async fn list_touching(&self, user_id: Uuid) -> Result<Vec<FollowEdge>>;

    async fn delete_touching(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> Result<Notification>;

    /// Newest first.
    async fn list_for(&self, recipient_id: Uuid, limit: Option<i64>) -> Result<Vec<Notification>>;

    async fn count_for(&self, recipient_id: Uuid) -> Result<i64>;

    async fn clear(&self, recipient_id: Uuid) -> Result<u64>;

    /// Removes notifications the user received or triggered.
    async fn delete_involving(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, author_id: Uuid, content: String, image: Option<String>)
        -> Result<Post>;

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Newest first.
    async fn list_all(&self) -> Result<Vec<Post>>;

    /// Newest first.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;

    async fn count_by_author(&self, author_id: Uuid) -> Result<i64>;

    /// Deletes the post and every like on it.
    async fn delete(&self, post_id: Uuid) -> Result<bool>;

    /// Deletes the author's posts and the likes on them.
    async fn delete_by_author(&self, author_id: Uuid) -> Result<u64>;

    /// `false` if the user already liked the post.
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn count_likes(&self, post_id: Uuid) -> Result<i64>;

    async fn delete_likes_by_user(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: NewJob) -> Result<Job>;

    /// Unexpired job by id.
    async fn find_active(&self, job_id: Uuid, now: OffsetDateTime) -> Result<Option<Job>>;

    /// Unexpired jobs, newest first.
    async fn list_active(&self, now: OffsetDateTime) -> Result<Vec<Job>>;

    /// `false` if the user already applied.
    async fn add_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn remove_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn delete(&self, job_id: Uuid) -> Result<bool>;

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64>;

    /// Deletes the user's postings and withdraws every application they made.
    async fn delete_for_user(&self, user_id: Uuid) -> Result<()>;
}

/// One handle per port, all usually backed by the same adapter.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + FollowRepository
            + NotificationRepository
            + PostRepository
            + JobRepository
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            follows: store.clone(),
            notifications: store.clone(),
            posts: store.clone(),
            jobs: store,
        }
    }
}
