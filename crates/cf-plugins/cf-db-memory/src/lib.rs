//! # cf-db-memory
//!
//! In-process implementation of `UserRepo` and `PostRepo`.
//! Used by the test-suite and for running the server without a database file.
//! Honors the same optimistic-version and uniqueness contract as the SQLite
//! store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use cf_core::error::{AppError, Result};
use cf_core::models::{Post, PostId, User, UserId};
use cf_core::traits::{PostRepo, UserRepo};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryUserStore {
    /// One lock over the whole collection so multi-document saves are atomic.
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Name, email or desired name of `user` already held by a document outside `skip`.
fn taken_field<'a>(
    existing: impl Iterator<Item = &'a User>,
    user: &User,
    skip: &HashSet<UserId>,
) -> Option<String> {
    for other in existing.filter(|other| !skip.contains(&other.id)) {
        if other.name == user.name {
            return Some(format!("name '{}' is already taken", user.name));
        }
        if other.email == user.email {
            return Some(format!("email '{}' is already registered", user.email));
        }
        if user.desired_name.is_some() && other.desired_name == user.desired_name {
            return Some(format!(
                "desired name '{}' is already taken",
                user.desired_name.as_deref().unwrap_or_default()
            ));
        }
    }
    None
}

#[async_trait]
impl UserRepo for MemoryUserStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn insert_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!("user {} already exists", user.id)));
        }
        if let Some(reason) = taken_field(users.values(), &user, &HashSet::new()) {
            return Err(AppError::Conflict(reason));
        }

        user.version = 1;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_users(&self, docs: Vec<User>) -> Result<Vec<User>> {
        let mut users = self.users.write().await;
        let ids: HashSet<UserId> = docs.iter().map(|doc| doc.id).collect();
        if ids.len() != docs.len() {
            return Err(AppError::Internal("the same document was saved twice in one batch".into()));
        }

        // validate everything before touching anything
        for doc in &docs {
            let stored = users
                .get(&doc.id)
                .ok_or_else(|| AppError::not_found("User", doc.id))?;
            if stored.version != doc.version {
                return Err(AppError::VersionConflict(doc.id.to_string()));
            }
            if let Some(reason) = taken_field(users.values(), doc, &ids) {
                return Err(AppError::Conflict(reason));
            }
        }

        let saved: Vec<User> = docs
            .into_iter()
            .map(|mut doc| {
                doc.version += 1;
                users.insert(doc.id, doc.clone());
                doc
            })
            .collect();
        tracing::trace!(count = saved.len(), "saved user documents");
        Ok(saved)
    }
}

#[derive(Default)]
pub struct MemoryPostStore {
    posts: DashMap<PostId, Post>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepo for MemoryPostStore {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|post| post.value().clone()))
    }

    async fn insert_post(&self, mut post: Post) -> Result<Post> {
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("post {} already exists", post.id))),
            Entry::Vacant(slot) => {
                post.version = 1;
                slot.insert(post.clone());
                Ok(post)
            }
        }
    }

    async fn save_post(&self, mut post: Post) -> Result<Post> {
        let mut stored = self
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::not_found("Post", post.id))?;
        if stored.version != post.version {
            return Err(AppError::VersionConflict(post.id.to_string()));
        }
        post.version += 1;
        *stored = post.clone();
        Ok(post)
    }

    async fn posts_by(&self, posters: &[UserId]) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| posters.contains(&entry.poster.id))
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::models::User;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), "hash".into())
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert_user(user("alice")).await.unwrap();

        let mut twin = user("alice2");
        twin.email = "alice@example.com".into();
        let err = store.insert_user(twin).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected_and_nothing_written() {
        let store = MemoryUserStore::new();
        let a = store.insert_user(user("alice")).await.unwrap();
        let b = store.insert_user(user("bobby")).await.unwrap();

        // someone else saves `b` first
        store.save_users(vec![b.clone()]).await.unwrap();

        let mut a_edit = a.clone();
        a_edit.hobbies.push("chess".into());
        let err = store.save_users(vec![a_edit, b]).await.unwrap_err();
        assert!(matches!(err, AppError::VersionConflict(_)));

        let stored = store.find_user(a.id).await.unwrap().unwrap();
        assert!(stored.hobbies.is_empty());
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = MemoryUserStore::new();
        let a = store.insert_user(user("alice")).await.unwrap();
        let saved = store.save_users(vec![a]).await.unwrap();
        assert_eq!(saved[0].version, 2);
    }

    #[tokio::test]
    async fn test_post_versioning() {
        let store = MemoryPostStore::new();
        let poster = user("alice").stub();
        let post = store
            .insert_post(Post::new(poster, "hello".into(), None))
            .await
            .unwrap();

        store.save_post(post.clone()).await.unwrap();
        let err = store.save_post(post).await.unwrap_err();
        assert!(matches!(err, AppError::VersionConflict(_)));
    }
}
