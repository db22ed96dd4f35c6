//! connectify/crates/cf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Connectify.

pub mod error;
pub mod events;
pub mod feed;
pub mod friends;
pub mod messages;
pub mod models;
pub mod retry;
pub mod traits;
pub mod users;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use events::*;
pub use feed::{FeedService, NewPost};
pub use friends::FriendManager;
pub use messages::ThreadResolver;
pub use models::*;
pub use retry::RetryPolicy;
pub use traits::*;
pub use users::{AccountService, ProfileUpdate, RegisterInput, UserField};
pub use validation::{FieldError, Validate, ValidationErrors, Validator};
