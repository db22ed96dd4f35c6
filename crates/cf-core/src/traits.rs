//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::DomainEvent;
use crate::models::{Post, PostId, User, UserId};

/// Document persistence contract for user aggregates.
///
/// Saves are optimistic: a document whose `version` no longer matches the
/// stored one is rejected with `AppError::VersionConflict`, and the store
/// bumps `version` on every successful write.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
    /// Exact match on the normalized (lowercase) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Stores a new document. Fails with `AppError::Conflict` when the name,
    /// email or desired name is already taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Writes every document or none of them, returning the saved copies in
    /// input order.
    async fn save_users(&self, users: Vec<User>) -> Result<Vec<User>>;
}

/// Persistence contract for feed posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>>;
    async fn insert_post(&self, post: Post) -> Result<Post>;
    /// Same optimistic contract as `UserRepo::save_users`.
    async fn save_post(&self, post: Post) -> Result<Post>;
    /// Posts authored by any of `posters`, newest first.
    async fn posts_by(&self, posters: &[UserId]) -> Result<Vec<Post>>;
}

/// Credentials contract: password hashing, bearer tokens, confirmation codes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    fn issue_token(&self, user_id: UserId) -> anyhow::Result<String>;

    /// Decodes a bearer token into the id of the user it was issued for.
    /// Fails with `AppError::Unauthorized`.
    fn verify_token(&self, token: &str) -> Result<UserId>;

    /// A six-digit code mailed at registration.
    fn generate_confirmation_code(&self) -> anyhow::Result<String>;
}

/// Transactional email contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation_code(&self, name: &str, email: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome(&self, name: &str, email: &str) -> anyhow::Result<()>;
}

/// Publish/subscribe contract. Delivery is best effort: publishing never
/// fails the mutation that produced the event.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait EventBus: Send + Sync {
    fn publish(&self, event: DomainEvent);
}
