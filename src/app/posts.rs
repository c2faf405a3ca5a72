use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::app::notifications::NotificationService;
use crate::domain::notification::NotificationKind;
use crate::domain::ports::{PostRepository, Repositories, UserRepository};
use crate::domain::post::{LikeToggle, Post, PostView};
use crate::domain::user::{User, UserSummary};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("content is required")]
    EmptyContent,
    #[error("post not found")]
    NotFound,
    #[error("not authorized to delete this post")]
    NotAuthor,
    #[error("post has not been liked")]
    NotLiked,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    notifier: NotificationService,
}

impl PostService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            posts: repos.posts.clone(),
            notifier: NotificationService::new(repos),
        }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        content: &str,
        image: Option<String>,
    ) -> Result<PostView, PostError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PostError::EmptyContent);
        }
        let author = self
            .users
            .find_by_id(author_id)
            .await?
            .ok_or(PostError::UserNotFound)?;

        let image = image.filter(|image| !image.trim().is_empty());
        let post = self
            .posts
            .insert(author_id, content.to_string(), image)
            .await?;

        Ok(PostView {
            id: post.id,
            author: Some(UserSummary::from(&author)),
            content: post.content,
            image: post.image,
            created_at: post.created_at,
            like_count: 0,
            liked_by_user: false,
        })
    }

    /// Every post, newest first, as seen by `viewer_id`.
    pub async fn feed(&self, viewer_id: Uuid) -> Result<Vec<PostView>, PostError> {
        let posts = self.posts.list_all().await?;
        self.render(viewer_id, posts).await
    }

    pub async fn list_by_author(
        &self,
        viewer_id: Uuid,
        author_id: Uuid,
    ) -> Result<Vec<PostView>, PostError> {
        let posts = self.posts.list_by_author(author_id).await?;
        self.render(viewer_id, posts).await
    }

    pub async fn get(&self, viewer_id: Uuid, post_id: Uuid) -> Result<PostView, PostError> {
        let post = self.existing_post(post_id).await?;
        let mut views = self.render(viewer_id, vec![post]).await?;
        views.pop().ok_or(PostError::NotFound)
    }

    pub async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<(), PostError> {
        let post = self.existing_post(post_id).await?;
        if post.author_id != user_id {
            return Err(PostError::NotAuthor);
        }
        if !self.posts.delete(post_id).await? {
            return Err(PostError::NotFound);
        }
        Ok(())
    }

    /// Likes the post, or removes the like if the user already left one.
    /// Liking someone else's post notifies its author.
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, PostError> {
        let post = self.existing_post(post_id).await?;

        if !self.posts.insert_like(user_id, post_id).await? {
            self.posts.delete_like(user_id, post_id).await?;
            return Ok(LikeToggle::Removed);
        }

        if post.author_id != user_id {
            match self.users.find_by_id(user_id).await? {
                Some(liker) => {
                    self.notifier
                        .emit(post.author_id, &liker, NotificationKind::Like, Some(post.id))
                        .await
                }
                None => tracing::warn!(user_id = %user_id, "liking user vanished, skipping notification"),
            }
        }

        Ok(LikeToggle::Liked)
    }

    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<(), PostError> {
        self.existing_post(post_id).await?;
        if !self.posts.delete_like(user_id, post_id).await? {
            return Err(PostError::NotLiked);
        }
        Ok(())
    }

    async fn existing_post(&self, post_id: Uuid) -> Result<Post, PostError> {
        self.posts.find(post_id).await?.ok_or(PostError::NotFound)
    }

    async fn render(&self, viewer_id: Uuid, posts: Vec<Post>) -> Result<Vec<PostView>, PostError> {
        let mut author_ids: Vec<Uuid> = posts.iter().map(|post| post.author_id).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors: Vec<User> = self.users.find_many(&author_ids).await?;

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let like_count = self.posts.count_likes(post.id).await?;
            let liked_by_user = self.posts.has_liked(viewer_id, post.id).await?;
            let author = authors
                .iter()
                .find(|user| user.id == post.author_id)
                .map(UserSummary::from);
            views.push(PostView {
                id: post.id,
                author,
                content: post.content,
                image: post.image,
                created_at: post.created_at,
                like_count,
                liked_by_user,
            });
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::UserWrite;
    use crate::domain::user::{NewUser, Role};
    use crate::infra::memory::MemoryStore;

    async fn add_user(repos: &Repositories, name: &str) -> User {
        match repos
            .users
            .insert(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "unused".to_string(),
                role: Role::JobSeeker,
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
    async fn like_toggles_and_notifies_author_once() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada").await;
        let bob = add_user(&repos, "Bob").await;
        let service = PostService::new(&repos);
        let post = service.create(ada.id, "hello", None).await.unwrap();

        assert_eq!(
            service.toggle_like(bob.id, post.id).await.unwrap(),
            LikeToggle::Liked
        );
        let view = service.get(bob.id, post.id).await.unwrap();
        assert_eq!(view.like_count, 1);
        assert!(view.liked_by_user);

        assert_eq!(
            service.toggle_like(bob.id, post.id).await.unwrap(),
            LikeToggle::Removed
        );
        assert_eq!(service.get(bob.id, post.id).await.unwrap().like_count, 0);

        let inbox = repos.notifications.list_for(ada.id, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Like);
        assert_eq!(inbox[0].post_id, Some(post.id));
        assert_eq!(inbox[0].message, "Bob liked your post");
    }

    #[tokio::test]
    async fn self_like_is_silent() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada").await;
        let service = PostService::new(&repos);
        let post = service.create(ada.id, "hello", None).await.unwrap();

        service.toggle_like(ada.id, post.id).await.unwrap();
        assert_eq!(repos.notifications.count_for(ada.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_author_deletes() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada").await;
        let bob = add_user(&repos, "Bob").await;
        let service = PostService::new(&repos);
        let post = service.create(ada.id, "hello", None).await.unwrap();
        service.toggle_like(bob.id, post.id).await.unwrap();

        assert!(matches!(
            service.delete(bob.id, post.id).await,
            Err(PostError::NotAuthor)
        ));
        service.delete(ada.id, post.id).await.unwrap();
        assert!(matches!(
            service.get(ada.id, post.id).await,
            Err(PostError::NotFound)
        ));
        assert!(!repos.posts.has_liked(bob.id, post.id).await.unwrap());
    }

    #[tokio::test]
    async fn validation_errors() {
        let repos = Repositories::from_store(MemoryStore::new());
        let ada = add_user(&repos, "Ada").await;
        let service = PostService::new(&repos);

        assert!(matches!(
            service.create(ada.id, "   ", None).await,
            Err(PostError::EmptyContent)
        ));
        assert!(matches!(
            service.toggle_like(ada.id, Uuid::new_v4()).await,
            Err(PostError::NotFound)
        ));
        let post = service.create(ada.id, "hi", None).await.unwrap();
        assert!(matches!(
            service.unlike(ada.id, post.id).await,
            Err(PostError::NotLiked)
        ));
    }
}
