//! GraphQL object and input types.
//!
//! These mirror the domain models; secrets (`password_hash`,
//! `confirmation_code`) and the storage `version` never leave the server.

use async_graphql::{Enum, InputObject, SimpleObject};
use cf_core::models as domain;
use cf_core::{DomainEvent, ProfileUpdate, RegisterInput as DomainRegisterInput};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Inactive,
    Active,
}

impl From<domain::RegistrationStatus> for RegistrationStatus {
    fn from(status: domain::RegistrationStatus) -> Self {
        match status {
            domain::RegistrationStatus::Inactive => RegistrationStatus::Inactive,
            domain::RegistrationStatus::Active => RegistrationStatus::Active,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    FriendRequest,
    FriendAccepted,
    Message,
}

impl From<domain::NotificationKind> for NotificationKind {
    fn from(kind: domain::NotificationKind) -> Self {
        match kind {
            domain::NotificationKind::FriendRequest => NotificationKind::FriendRequest,
            domain::NotificationKind::FriendAccepted => NotificationKind::FriendAccepted,
            domain::NotificationKind::Message => NotificationKind::Message,
        }
    }
}

/// Another user's identity as embedded in lists.
#[derive(SimpleObject, Debug, Clone)]
pub struct Peer {
    pub id: Uuid,
    pub name: String,
    pub desired_name: Option<String>,
}

impl From<domain::PeerStub> for Peer {
    fn from(stub: domain::PeerStub) -> Self {
        Self {
            id: stub.id,
            name: stub.name,
            desired_name: stub.desired_name,
        }
    }
}

fn peers(stubs: Vec<domain::PeerStub>) -> Vec<Peer> {
    stubs.into_iter().map(Peer::from).collect()
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Friends {
    /// Incoming requests
    pub requests: Vec<Peer>,
    /// Outgoing requests
    pub pendings: Vec<Peer>,
    pub accepted: Vec<Peer>,
}

impl From<domain::Friends> for Friends {
    fn from(friends: domain::Friends) -> Self {
        Self {
            requests: peers(friends.requests),
            pendings: peers(friends.pendings),
            accepted: peers(friends.accepted),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Entry {
    pub id: Uuid,
    pub sender: Peer,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl From<domain::Entry> for Entry {
    fn from(entry: domain::Entry) -> Self {
        Self {
            id: entry.id,
            sender: entry.sender.into(),
            content: entry.content,
            sent_at: entry.sent_at,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Thread {
    pub id: Uuid,
    pub sender: Peer,
    pub receiver: Peer,
    pub inbox: Vec<Entry>,
}

impl From<domain::Thread> for Thread {
    fn from(thread: domain::Thread) -> Self {
        Self {
            id: thread.id,
            sender: thread.sender.into(),
            receiver: thread.receiver.into(),
            inbox: thread.inbox.into_iter().map(Entry::from).collect(),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    #[graphql(name = "from")]
    pub actor: Peer,
    pub created_at: DateTime<Utc>,
}

impl From<domain::Notification> for Notification {
    fn from(n: domain::Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.into(),
            actor: n.from.into(),
            created_at: n.created_at,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub hobbies: Vec<String>,
    pub status: RegistrationStatus,
    pub network: Option<Uuid>,
    pub feed: Vec<Uuid>,
    pub friends: Friends,
    pub messages: Vec<Thread>,
    pub notifications: Vec<Notification>,
    pub created_at: DateTime<Utc>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            desired_name: user.desired_name,
            gender: user.gender,
            phone: user.phone,
            city: user.city,
            country: user.country,
            continent: user.continent,
            hobbies: user.hobbies,
            status: user.status.into(),
            network: user.network,
            feed: user.feed,
            friends: user.friends.into(),
            messages: user.messages.into_iter().map(Thread::from).collect(),
            notifications: user.notifications.into_iter().map(Notification::from).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub comment_by: Peer,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub poster: Peer,
    pub content: String,
    pub media: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Peer>,
    pub comments: Vec<Comment>,
}

impl From<domain::Post> for Post {
    fn from(post: domain::Post) -> Self {
        Self {
            id: post.id,
            poster: post.poster.into(),
            content: post.content,
            media: post.media,
            created_at: post.created_at,
            likes: peers(post.likes),
            comments: post
                .comments
                .into_iter()
                .map(|c| Comment {
                    id: c.id,
                    comment_by: c.comment_by.into(),
                    content: c.content,
                    created_at: c.created_at,
                })
                .collect(),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Outcome of a bulk operation.
#[derive(SimpleObject, Debug, Clone)]
pub struct Confirmation {
    pub success: bool,
    pub message: String,
    /// Number of relationships removed
    pub removed: i32,
}

/// Pushed to the counterpart of a friend-protocol transition.
#[derive(SimpleObject, Debug, Clone)]
pub struct FriendEvent {
    /// e.g. `FRIEND_REQUESTED`
    pub topic: String,
    #[graphql(name = "from")]
    pub actor: Peer,
    /// The acting user's relationship lists after the transition
    pub friends: Friends,
}

/// Pushed to the receiver of a message.
#[derive(SimpleObject, Debug, Clone)]
pub struct MessageEvent {
    #[graphql(name = "from")]
    pub actor: Peer,
    pub entry: Entry,
}

impl MessageEvent {
    pub(crate) fn from_event(event: DomainEvent) -> Option<Self> {
        match event {
            DomainEvent::MessageSent { actor, entry, .. } => Some(Self {
                actor: actor.stub().into(),
                entry: entry.into(),
            }),
            DomainEvent::Friend { .. } => None,
        }
    }
}

impl From<DomainEvent> for FriendEvent {
    fn from(event: DomainEvent) -> Self {
        let topic = event.topic().to_string();
        let actor = match event {
            DomainEvent::Friend { actor, .. } | DomainEvent::MessageSent { actor, .. } => actor,
        };
        Self {
            topic,
            actor: actor.stub().into(),
            friends: actor.friends.into(),
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    #[graphql(default)]
    pub hobbies: Vec<String>,
}

impl From<RegisterInput> for DomainRegisterInput {
    fn from(input: RegisterInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            password: input.password,
            desired_name: input.desired_name,
            gender: input.gender,
            phone: input.phone,
            city: input.city,
            country: input.country,
            continent: input.continent,
            hobbies: input.hobbies,
        }
    }
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ProfileInput {
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub hobbies: Option<Vec<String>>,
}

impl From<ProfileInput> for ProfileUpdate {
    fn from(input: ProfileInput) -> Self {
        Self {
            desired_name: input.desired_name,
            gender: input.gender,
            phone: input.phone,
            city: input.city,
            country: input.country,
            continent: input.continent,
            hobbies: input.hobbies,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct PostInput {
    pub content: String,
    pub media: Option<String>,
}
