//! Domain events published after a successful mutation.

use std::fmt;

use crate::models::{Entry, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    FriendRequested,
    FriendAccepted,
    FriendCancelled,
    FriendDeclined,
    MessageSent,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::FriendRequested => "FRIEND_REQUESTED",
            Topic::FriendAccepted => "FRIEND_ACCEPTED",
            Topic::FriendCancelled => "FRIEND_CANCELLED",
            Topic::FriendDeclined => "FRIEND_DECLINED",
            Topic::MessageSent => "MESSAGE_SENT",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change that subscribers may care about.
///
/// `actor` is the aggregate of the user who performed the mutation, as saved.
/// `counterpart` is the other user of the pair; subscription streams are
/// filtered on it.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    Friend {
        topic: Topic,
        actor: User,
        counterpart: UserId,
    },
    MessageSent {
        actor: User,
        counterpart: UserId,
        entry: Entry,
    },
}

impl DomainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::Friend { topic, .. } => *topic,
            DomainEvent::MessageSent { .. } => Topic::MessageSent,
        }
    }

    pub fn actor(&self) -> &User {
        match self {
            DomainEvent::Friend { actor, .. } | DomainEvent::MessageSent { actor, .. } => actor,
        }
    }

    pub fn counterpart(&self) -> UserId {
        match self {
            DomainEvent::Friend { counterpart, .. }
            | DomainEvent::MessageSent { counterpart, .. } => *counterpart,
        }
    }
}
