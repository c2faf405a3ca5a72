//! In-process store used for local runs (`STORE_BACKEND=memory`) and tests.
//! All tables live behind one lock so multi-row operations stay consistent.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::follow::{FollowEdge, FollowStatus};
use crate::domain::job::{Job, NewJob};
use crate::domain::notification::{NewNotification, Notification};
use crate::domain::ports::{
    FollowRepository, JobRepository, NotificationRepository, PostRepository, UserRepository,
    UserWrite,
};
use crate::domain::post::Post;
use crate::domain::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    follows: BTreeMap<(Uuid, Uuid), FollowEdge>,
    notifications: Vec<Notification>,
    posts: HashMap<Uuid, Post>,
    likes: BTreeSet<(Uuid, Uuid)>,
    jobs: HashMap<Uuid, Job>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by id so listings are stable.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (OffsetDateTime, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn email_in_use(tables: &Tables, email: &str, except: Option<Uuid>) -> bool {
    tables
        .users
        .values()
        .any(|user| user.email == email && Some(user.id) != except)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, user: NewUser) -> Result<UserWrite> {
        let mut tables = self.tables.write().await;
        if email_in_use(&tables, &user.email, None) {
            return Ok(UserWrite::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            avatar: user.avatar,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(UserWrite::Saved(user))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn update(&self, user: &User) -> Result<UserWrite> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Ok(UserWrite::Missing);
        }
        if email_in_use(&tables, &user.email, Some(user.id)) {
            return Ok(UserWrite::EmailTaken);
        }

        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(UserWrite::Missing);
        };
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.role = user.role;
        stored.avatar = user.avatar.clone();
        Ok(UserWrite::Saved(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn find(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        let tables = self.tables.read().await;
        Ok(tables.follows.get(&(follower_id, following_id)).cloned())
    }

    async fn insert_pending(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>> {
        let mut tables = self.tables.write().await;
        let key = (follower_id, following_id);
        if tables.follows.contains_key(&key) {
            return Ok(None);
        }

        let edge = FollowEdge {
            follower_id,
            following_id,
            status: FollowStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.follows.insert(key, edge.clone());
        Ok(Some(edge))
    }

    async fn accept(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        let mut tables = self.tables.write().await;
        match tables.follows.get_mut(&(follower_id, following_id)) {
            Some(edge) if edge.status == FollowStatus::Pending => {
                edge.status = FollowStatus::Accepted;
                Ok(Some(edge.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_pending(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let key = (follower_id, following_id);
        match tables.follows.get(&key) {
            Some(edge) if edge.status == FollowStatus::Pending => {
                tables.follows.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.follows.remove(&(follower_id, following_id)).is_some())
    }

    async fn list_incoming(
        &self,
        following_id: Uuid,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>> {
        let tables = self.tables.read().await;
        let mut edges: Vec<FollowEdge> = tables
            .follows
            .values()
            .filter(|edge| edge.following_id == following_id && edge.status == status)
            .cloned()
            .collect();
        edges.sort_by_key(|edge| (edge.created_at, edge.follower_id));
        Ok(edges)
    }

    async fn list_touching(&self, user_id: Uuid) -> Result<Vec<FollowEdge>> {
        let tables = self.tables.read().await;
        let mut edges: Vec<FollowEdge> = tables
            .follows
            .values()
            .filter(|edge| edge.follower_id == user_id || edge.following_id == user_id)
            .cloned()
            .collect();
        edges.sort_by_key(|edge| (edge.created_at, edge.follower_id, edge.following_id));
        Ok(edges)
    }

    async fn delete_touching(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|(follower_id, following_id), _| {
                *follower_id != user_id && *following_id != user_id
            });
        Ok((before - tables.follows.len()) as u64)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(&self, notification: NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            origin_id: notification.origin_id,
            kind: notification.kind,
            post_id: notification.post_id,
            message: notification.message,
            read: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_for(&self, recipient_id: Uuid, limit: Option<i64>) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|notification| notification.recipient_id == recipient_id)
            .cloned()
            .collect();
        // Insertion order breaks timestamp ties, so the latest push comes first.
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            items.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(items)
    }

    async fn count_for(&self, recipient_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .notifications
            .iter()
            .filter(|notification| notification.recipient_id == recipient_id)
            .count();
        Ok(count as i64)
    }

    async fn clear(&self, recipient_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|notification| notification.recipient_id != recipient_id);
        Ok((before - tables.notifications.len()) as u64)
    }

    async fn delete_involving(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|notification| {
            notification.recipient_id != user_id && notification.origin_id != Some(user_id)
        });
        Ok((before - tables.notifications.len()) as u64)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert(
        &self,
        author_id: Uuid,
        content: String,
        image: Option<String>,
    ) -> Result<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            content,
            image,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&post_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        newest_first(&mut posts, |post| (post.created_at, post.id));
        Ok(posts)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| post.author_id == author_id)
            .cloned()
            .collect();
        newest_first(&mut posts, |post| (post.created_at, post.id));
        Ok(posts)
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .posts
            .values()
            .filter(|post| post.author_id == author_id)
            .count();
        Ok(count as i64)
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.posts.remove(&post_id).is_some();
        tables.likes.retain(|(_, liked_post)| *liked_post != post_id);
        tables
            .notifications
            .retain(|notification| notification.post_id != Some(post_id));
        Ok(removed)
    }

    async fn delete_by_author(&self, author_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let owned: BTreeSet<Uuid> = tables
            .posts
            .values()
            .filter(|post| post.author_id == author_id)
            .map(|post| post.id)
            .collect();
        tables.posts.retain(|id, _| !owned.contains(id));
        tables.likes.retain(|(_, post_id)| !owned.contains(post_id));
        tables.notifications.retain(|notification| {
            notification
                .post_id
                .map_or(true, |post_id| !owned.contains(&post_id))
        });
        Ok(owned.len() as u64)
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.likes.insert((user_id, post_id)))
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.likes.remove(&(user_id, post_id)))
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self.tables.read().await.likes.contains(&(user_id, post_id)))
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .likes
            .iter()
            .filter(|(_, liked_post)| *liked_post == post_id)
            .count();
        Ok(count as i64)
    }

    async fn delete_likes_by_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.likes.len();
        tables.likes.retain(|(liker, _)| *liker != user_id);
        Ok((before - tables.likes.len()) as u64)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn insert(&self, job: NewJob) -> Result<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            title: job.title,
            description: job.description,
            location: job.location,
            salary: job.salary,
            skills: job.skills,
            posted_by: job.posted_by,
            applicants: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
            expires_at: job.expires_at,
        };
        self.tables.write().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_active(&self, job_id: Uuid, now: OffsetDateTime) -> Result<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .get(&job_id)
            .filter(|job| !job.is_expired(now))
            .cloned())
    }

    async fn list_active(&self, now: OffsetDateTime) -> Result<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| !job.is_expired(now))
            .cloned()
            .collect();
        newest_first(&mut jobs, |job| (job.created_at, job.id));
        Ok(jobs)
    }

    async fn add_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.jobs.get_mut(&job_id) {
            Some(job) if !job.applicants.contains(&user_id) => {
                job.applicants.push(user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_applicant(&self, job_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(job) = tables.jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        let before = job.applicants.len();
        job.applicants.retain(|applicant| *applicant != user_id);
        Ok(job.applicants.len() < before)
    }

    async fn delete(&self, job_id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.jobs.remove(&job_id).is_some())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.jobs.len();
        tables.jobs.retain(|_, job| !job.is_expired(now));
        Ok((before - tables.jobs.len()) as u64)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.jobs.retain(|_, job| job.posted_by != user_id);
        for job in tables.jobs.values_mut() {
            job.applicants.retain(|applicant| *applicant != user_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Grace".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::JobSeeker,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn second_pending_edge_for_same_pair_is_refused() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.insert_pending(a, b).await.unwrap().is_some());
        assert!(store.insert_pending(a, b).await.unwrap().is_none());
        // The reverse direction is a different edge.
        assert!(store.insert_pending(b, a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_requests_create_one_edge() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_pending(a, b).await.unwrap().is_some() })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_touching(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accept_and_delete_pending_only_touch_pending_edges() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_pending(a, b).await.unwrap();

        let accepted = store.accept(a, b).await.unwrap().unwrap();
        assert_eq!(accepted.status, FollowStatus::Accepted);
        assert!(store.accept(a, b).await.unwrap().is_none());
        assert!(!store.delete_pending(a, b).await.unwrap());
        assert!(FollowRepository::delete(&store, a, b).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let store = MemoryStore::new();
        assert!(matches!(
            UserRepository::insert(&store, new_user("grace@example.com")).await.unwrap(),
            UserWrite::Saved(_)
        ));
        assert!(matches!(
            UserRepository::insert(&store, new_user("grace@example.com")).await.unwrap(),
            UserWrite::EmailTaken
        ));
    }

    #[tokio::test]
    async fn notifications_list_newest_first_with_limit() {
        let store = MemoryStore::new();
        let recipient = Uuid::new_v4();
        for message in ["first", "second", "third"] {
            NotificationRepository::insert(
                &store,
                NewNotification {
                    recipient_id: recipient,
                    origin_id: None,
                    kind: crate::domain::notification::NotificationKind::Like,
                    post_id: None,
                    message: message.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let latest = store.list_for(recipient, Some(2)).await.unwrap();
        let messages: Vec<_> = latest.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn deleting_a_post_drops_its_like_notifications() {
        let store = MemoryStore::new();
        let (author, liker) = (Uuid::new_v4(), Uuid::new_v4());
        let post = PostRepository::insert(&store, author, "hello".to_string(), None)
            .await
            .unwrap();
        store.insert_like(liker, post.id).await.unwrap();
        for post_id in [Some(post.id), None] {
            NotificationRepository::insert(
                &store,
                NewNotification {
                    recipient_id: author,
                    origin_id: Some(liker),
                    kind: crate::domain::notification::NotificationKind::Like,
                    post_id,
                    message: "Grace liked your post".to_string(),
                },
            )
            .await
            .unwrap();
        }

        assert!(PostRepository::delete(&store, post.id).await.unwrap());
        assert_eq!(store.count_likes(post.id).await.unwrap(), 0);
        let remaining = store.list_for(author, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].post_id, None);
    }

    #[tokio::test]
    async fn expired_jobs_are_hidden_and_purged() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let job = JobRepository::insert(
            &store,
            NewJob {
                title: "Rust engineer".to_string(),
                description: "Async services".to_string(),
                location: "Remote".to_string(),
                salary: None,
                skills: vec!["rust".to_string()],
                posted_by: Uuid::new_v4(),
                expires_at: now - time::Duration::seconds(1),
            },
        )
        .await
        .unwrap();

        assert!(store.find_active(job.id, now).await.unwrap().is_none());
        assert!(store.list_active(now).await.unwrap().is_empty());
        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
    }
}
