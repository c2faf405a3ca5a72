use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::app::auth::{
    check_password_length, hash_password, parse_role, required, verify_password, AccountError,
};
use crate::app::notifications::NotificationService;
use crate::domain::follow::{Connections, FollowStatus};
use crate::domain::notification::Notification;
use crate::domain::ports::{
    FollowRepository, JobRepository, PostRepository, Repositories, UserRepository, UserWrite,
};
use crate::domain::user::{normalize_email, PublicUser, User};

const DASHBOARD_NOTIFICATIONS: i64 = 10;

/// Partial profile edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub old_password: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(flatten)]
    pub connections: Connections,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub posts: i64,
    pub follow_requests: i64,
    pub notifications: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub notifications: Vec<Notification>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    posts: Arc<dyn PostRepository>,
    jobs: Arc<dyn JobRepository>,
    notifications: NotificationService,
}

impl UserService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            follows: repos.follows.clone(),
            posts: repos.posts.clone(),
            jobs: repos.jobs.clone(),
            notifications: NotificationService::new(repos),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        let mut user = self.get(user_id).await?;

        if let Some(password) = update.password.filter(|value| !value.is_empty()) {
            let old_password = update
                .old_password
                .filter(|value| !value.is_empty())
                .ok_or(AccountError::OldPasswordRequired)?;
            if !verify_password(&old_password, &user.password_hash)? {
                return Err(AccountError::IncorrectPassword);
            }
            check_password_length(&password)?;
            user.password_hash = hash_password(&password)?;
        }

        if let Some(name) = update.name {
            user.name = required(&name, "name")?;
        }
        if let Some(email) = update.email {
            let email = normalize_email(&email);
            if email.is_empty() {
                return Err(AccountError::MissingField("email"));
            }
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = parse_role(&role)?;
        }
        if let Some(avatar) = update.avatar {
            let avatar = avatar.trim();
            user.avatar = (!avatar.is_empty()).then(|| avatar.to_string());
        }

        self.save(&user).await
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if current_password.is_empty() {
            return Err(AccountError::MissingField("current_password"));
        }
        if new_password.is_empty() {
            return Err(AccountError::MissingField("new_password"));
        }

        let mut user = self.get(user_id).await?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AccountError::IncorrectPassword);
        }
        check_password_length(new_password)?;
        user.password_hash = hash_password(new_password)?;

        self.save(&user).await?;
        Ok(())
    }

    /// Removes the account together with everything that references it.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AccountError> {
        self.get(user_id).await?;

        let posts = self.posts.delete_by_author(user_id).await?;
        let likes = self.posts.delete_likes_by_user(user_id).await?;
        let edges = self.follows.delete_touching(user_id).await?;
        let notifications = self.notifications.delete_involving(user_id).await?;
        self.jobs.delete_for_user(user_id).await?;

        if !self.users.delete(user_id).await? {
            return Err(AccountError::UserNotFound);
        }

        info!(
            user_id = %user_id,
            posts,
            likes,
            edges,
            notifications,
            "account deleted"
        );
        Ok(())
    }

    /// Every account with its follower, following and pending id lists.
    pub async fn directory(&self) -> Result<Vec<DirectoryEntry>, AccountError> {
        let users = self.users.list().await?;
        let mut entries = Vec::with_capacity(users.len());
        for user in users {
            let edges = self.follows.list_touching(user.id).await?;
            entries.push(DirectoryEntry {
                connections: Connections::from_edges(user.id, &edges),
                user: PublicUser::from(user),
            });
        }
        Ok(entries)
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<Dashboard, AccountError> {
        let posts = self.posts.count_by_author(user_id).await?;
        let follow_requests = self
            .follows
            .list_incoming(user_id, FollowStatus::Pending)
            .await?
            .len() as i64;
        let notification_count = self.notifications.count(user_id).await?;
        let notifications = self
            .notifications
            .list(user_id, Some(DASHBOARD_NOTIFICATIONS))
            .await?;

        Ok(Dashboard {
            stats: DashboardStats {
                posts,
                follow_requests,
                notifications: notification_count,
            },
            notifications,
        })
    }

    async fn save(&self, user: &User) -> Result<User, AccountError> {
        match self.users.update(user).await? {
            UserWrite::Saved(user) => Ok(user),
            UserWrite::EmailTaken => Err(AccountError::EmailTaken),
            UserWrite::Missing => Err(AccountError::UserNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::follows::FollowService;
    use crate::app::posts::PostService;
    use crate::domain::job::NewJob;
    use crate::domain::user::{NewUser, Role};
    use crate::infra::memory::MemoryStore;
    use time::{Duration, OffsetDateTime};

    async fn add_user(repos: &Repositories, name: &str, password_hash: &str, role: Role) -> User {
        match repos
            .users
            .insert(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: password_hash.to_string(),
                role,
                avatar: None,
            })
            .await
            .unwrap()
        {
            UserWrite::Saved(user) => user,
            other => panic!("unexpected write outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn password_change_through_profile_needs_old_password() {
        let repos = Repositories::from_store(MemoryStore::new());
        let hash = hash_password("first password").unwrap();
        let ada = add_user(&repos, "Ada", &hash, Role::JobSeeker).await;
        let service = UserService::new(&repos);

        let err = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    password: Some("second password".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::OldPasswordRequired));

        let err = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    old_password: Some("not it at all".to_string()),
                    password: Some("second password".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::IncorrectPassword));

        let updated = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    name: Some("Ada L".to_string()),
                    role: Some("hiring".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L");
        assert_eq!(updated.role, Role::Hiring);
        assert_eq!(updated.password_hash, hash);
    }

    #[tokio::test]
    async fn email_update_respects_uniqueness() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada", "unused", Role::JobSeeker).await;
        add_user(&repos, "Bob", "unused", Role::JobSeeker).await;
        let service = UserService::new(&repos);

        let err = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    email: Some(" BOB@example.com".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }

    #[tokio::test]
    async fn delete_account_cascades() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada", "unused", Role::Hiring).await;
        let bob = add_user(&repos, "Bob", "unused", Role::JobSeeker).await;
        let follows = FollowService::new(&repos);
        let posts = PostService::new(&repos);

        follows.send_request(ada.id, bob.id).await.unwrap();
        follows.send_request(bob.id, ada.id).await.unwrap();
        let bobs_post = posts.create(bob.id, "hello", None).await.unwrap();
        posts.toggle_like(ada.id, bobs_post.id).await.unwrap();
        posts.create(ada.id, "mine", None).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let job = repos
            .jobs
            .insert(NewJob {
                title: "Engineer".to_string(),
                description: "Build".to_string(),
                location: "Remote".to_string(),
                salary: None,
                skills: vec![],
                posted_by: ada.id,
                expires_at: now + Duration::days(30),
            })
            .await
            .unwrap();
        repos.jobs.add_applicant(job.id, bob.id).await.unwrap();

        let service = UserService::new(&repos);
        service.delete_account(ada.id).await.unwrap();

        assert!(repos.users.find_by_id(ada.id).await.unwrap().is_none());
        assert!(repos.follows.list_touching(bob.id).await.unwrap().is_empty());
        assert_eq!(repos.notifications.count_for(bob.id).await.unwrap(), 0);
        assert_eq!(repos.posts.count_likes(bobs_post.id).await.unwrap(), 0);
        assert_eq!(repos.posts.count_by_author(ada.id).await.unwrap(), 0);
        assert!(repos.jobs.list_active(now).await.unwrap().is_empty());

        assert!(matches!(
            service.delete_account(ada.id).await,
            Err(AccountError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn dashboard_counts() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada", "unused", Role::JobSeeker).await;
        let bob = add_user(&repos, "Bob", "unused", Role::JobSeeker).await;
        FollowService::new(&repos)
            .send_request(bob.id, ada.id)
            .await
            .unwrap();
        PostService::new(&repos)
            .create(ada.id, "first", None)
            .await
            .unwrap();

        let dashboard = UserService::new(&repos).dashboard(ada.id).await.unwrap();
        assert_eq!(dashboard.stats.posts, 1);
        assert_eq!(dashboard.stats.follow_requests, 1);
        assert_eq!(dashboard.stats.notifications, 1);
        assert_eq!(dashboard.notifications.len(), 1);

        let directory = UserService::new(&repos).directory().await.unwrap();
        let entry = directory.iter().find(|entry| entry.user.id == ada.id).unwrap();
        assert_eq!(entry.connections.pending_requests, vec![bob.id]);
    }
}
