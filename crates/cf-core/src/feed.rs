//! # Feed
//!
//! Posts live in their own collection; the poster's `feed` list keeps the ids.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Comment, Post, PostId, User, UserId};
use crate::retry::RetryPolicy;
use crate::traits::{PostRepo, UserRepo};
use crate::validation::{Validate, ValidationErrors, Validator};

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub media: Option<String>,
}

impl Validate for NewPost {
    fn validate(&self) -> Result<()> {
        Validator::new()
            .required("content", &self.content)
            .not_blank("media", self.media.as_deref())
            .finish()
    }
}

pub struct FeedService {
    users: Arc<dyn UserRepo>,
    posts: Arc<dyn PostRepo>,
    retry: RetryPolicy,
}

impl FeedService {
    pub fn new(users: Arc<dyn UserRepo>, posts: Arc<dyn PostRepo>, retry: RetryPolicy) -> Self {
        Self { users, posts, retry }
    }

    async fn load_user(&self, id: UserId) -> Result<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn load_post(&self, id: PostId) -> Result<Post> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))
    }

    /// Load a post, edit it, save it; retried on version conflicts.
    async fn edit_post<F>(&self, caller: UserId, post_id: PostId, edit: F) -> Result<Post>
    where
        F: Fn(&mut Post, &User) -> Result<()> + Send + Sync,
    {
        let me = self.load_user(caller).await?;
        let (me, edit) = (&me, &edit);
        self.retry
            .run(move || async move {
                let mut post = self.load_post(post_id).await?;
                edit(&mut post, me)?;
                self.posts.save_post(post).await
            })
            .await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_post(&self, caller: UserId, input: NewPost) -> Result<Post> {
        input.validate()?;
        let me = self.load_user(caller).await?;
        let post = self
            .posts
            .insert_post(Post::new(me.stub(), input.content.trim().to_string(), input.media))
            .await?;

        let post_id = post.id;
        self.retry
            .run(move || async move {
                let mut me = self.load_user(caller).await?;
                me.feed.push(post_id);
                self.users.save_users(vec![me]).await
            })
            .await?;

        info!(post = %post.id, "post created");
        Ok(post)
    }

    #[tracing::instrument(skip(self))]
    pub async fn like(&self, caller: UserId, post_id: PostId) -> Result<Post> {
        self.edit_post(caller, post_id, |post, me| {
            if post.likes.iter().any(|like| like.id == me.id) {
                return Err(ValidationErrors::single("postId", "you already like this post").into());
            }
            post.likes.push(me.stub());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unlike(&self, caller: UserId, post_id: PostId) -> Result<Post> {
        self.edit_post(caller, post_id, |post, me| {
            let before = post.likes.len();
            post.likes.retain(|like| like.id != me.id);
            if post.likes.len() == before {
                return Err(AppError::not_found("Like", me.id));
            }
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self, content))]
    pub async fn comment(&self, caller: UserId, post_id: PostId, content: &str) -> Result<Post> {
        Validator::new().required("content", content).finish()?;
        let comment_id = Uuid::now_v7();
        self.edit_post(caller, post_id, |post, me| {
            // the same id on every retry keeps the comment unique
            if !post.comments.iter().any(|c| c.id == comment_id) {
                post.comments.push(Comment {
                    id: comment_id,
                    comment_by: me.stub(),
                    content: content.trim().to_string(),
                    created_at: Utc::now(),
                });
            }
            Ok(())
        })
        .await
    }

    /// Posts by the caller and their accepted friends, newest first.
    pub async fn feed(&self, caller: UserId) -> Result<Vec<Post>> {
        let me = self.load_user(caller).await?;
        let mut authors: Vec<UserId> = me.friends.accepted.iter().map(|stub| stub.id).collect();
        authors.push(me.id);
        let mut posts = self.posts.posts_by(&authors).await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}
