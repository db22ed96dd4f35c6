//! # Domain Models
//!
//! These structs represent the documents Connectify persists.
//! A `User` is the aggregate: friends, threads and notifications are embedded
//! in it and always loaded and saved together with it.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type ThreadId = Uuid;
pub type EntryId = Uuid;
pub type PostId = Uuid;

/// Registration lifecycle of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Registered but the emailed confirmation code has not been entered yet.
    #[default]
    Inactive,
    Active,
}

/// Minimal copy of another user's identity, embedded for display without a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStub {
    pub id: UserId,
    pub name: String,
    pub desired_name: Option<String>,
}

/// The three friend lists of a user. A peer id appears in at most one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friends {
    /// Incoming: peers who asked this user.
    pub requests: Vec<PeerStub>,
    /// Outgoing: peers this user asked, awaiting their answer.
    pub pendings: Vec<PeerStub>,
    pub accepted: Vec<PeerStub>,
}

impl Friends {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.pendings.is_empty() && self.accepted.is_empty()
    }

    /// Every peer id referenced by any of the three lists.
    pub fn peer_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .requests
            .iter()
            .chain(&self.pendings)
            .chain(&self.accepted)
            .map(|stub| stub.id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// One message inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub sender: PeerStub,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// A user's own copy of a conversation with one other user.
///
/// Both participants hold an independent copy with its own `id`; the
/// conversation is identified by the unordered pair of participant ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub sender: PeerStub,
    pub receiver: PeerStub,
    pub inbox: Vec<Entry>,
}

impl Thread {
    pub fn involves_pair(&self, a: UserId, b: UserId) -> bool {
        (self.sender.id == a && self.receiver.id == b)
            || (self.sender.id == b && self.receiver.id == a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FriendAccepted,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub from: PeerStub,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, from: PeerStub) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            from,
            created_at: Utc::now(),
        }
    }
}

/// The user aggregate as stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub status: RegistrationStatus,
    pub confirmation_code: Option<String>,
    /// Reference to the community network the user belongs to.
    pub network: Option<Uuid>,
    /// Ids of posts authored by this user, oldest first.
    #[serde(default)]
    pub feed: Vec<PostId>,
    #[serde(default)]
    pub friends: Friends,
    #[serde(default)]
    pub messages: Vec<Thread>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl User {
    /// A freshly registered, inactive account.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            desired_name: None,
            gender: None,
            phone: None,
            city: None,
            country: None,
            continent: None,
            password_hash,
            hobbies: Vec::new(),
            status: RegistrationStatus::Inactive,
            confirmation_code: None,
            network: None,
            feed: Vec::new(),
            friends: Friends::default(),
            messages: Vec::new(),
            notifications: Vec::new(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn stub(&self) -> PeerStub {
        PeerStub {
            id: self.id,
            name: self.name.clone(),
            desired_name: self.desired_name.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Active
    }
}

/// Someone who liked a post.
pub type Like = PeerStub;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub comment_by: PeerStub,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A feed item. Stored in its own collection, referenced from `User::feed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub poster: PeerStub,
    pub content: String,
    pub media: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub version: u64,
}

impl Post {
    pub fn new(poster: PeerStub, content: String, media: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            poster,
            content,
            media,
            created_at: Utc::now(),
            likes: Vec::new(),
            comments: Vec::new(),
            version: 0,
        }
    }
}
