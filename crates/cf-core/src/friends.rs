//! # Friend Relationship Manager
//!
//! The friend protocol between two user aggregates:
//!
//! ```text
//! None ──request──▶ Requested ──accept──▶ Accepted
//!                       │
//!                       └──cancel / decline──▶ None
//! ```
//!
//! The transition functions below are pure and mutate both aggregates in
//! memory; `FriendManager` loads, applies and saves both documents in one
//! atomic write.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, FriendshipError, Result};
use crate::events::{DomainEvent, Topic};
use crate::models::{Friends, Notification, NotificationKind, PeerStub, User, UserId};
use crate::retry::RetryPolicy;
use crate::traits::{EventBus, UserRepo};

type Transition = fn(&mut User, &mut User) -> std::result::Result<(), FriendshipError>;

fn contains(list: &[PeerStub], id: UserId) -> bool {
    list.iter().any(|stub| stub.id == id)
}

fn remove(list: &mut Vec<PeerStub>, id: UserId) {
    list.retain(|stub| stub.id != id);
}

fn push_unique(list: &mut Vec<PeerStub>, stub: PeerStub) {
    if !contains(list, stub.id) {
        list.push(stub);
    }
}

/// `requester` has an outgoing request to `target` and `target` sees it.
fn is_pending(requester: &User, target: &User) -> bool {
    contains(&requester.friends.pendings, target.id) && contains(&target.friends.requests, requester.id)
}

/// None → Requested.
pub fn request(requester: &mut User, target: &mut User) -> std::result::Result<(), FriendshipError> {
    if requester.id == target.id {
        return Err(FriendshipError::InvalidRequest);
    }
    let mine = &requester.friends;
    if contains(&mine.accepted, target.id) {
        return Err(FriendshipError::AlreadyFriends);
    }
    if contains(&mine.pendings, target.id) {
        return Err(FriendshipError::AlreadyPending);
    }
    if contains(&mine.requests, target.id) {
        return Err(FriendshipError::IncomingRequestExists);
    }

    requester.friends.pendings.push(target.stub());
    target.friends.requests.push(requester.stub());
    target
        .notifications
        .push(Notification::new(NotificationKind::FriendRequest, requester.stub()));
    Ok(())
}

/// Requested → Accepted, called on behalf of the request's target.
pub fn accept(accepter: &mut User, requester: &mut User) -> std::result::Result<(), FriendshipError> {
    if accepter.id == requester.id {
        return Err(FriendshipError::InvalidRequest);
    }
    if !is_pending(requester, accepter) {
        return Err(FriendshipError::NoSuchRequest);
    }

    remove(&mut accepter.friends.requests, requester.id);
    remove(&mut requester.friends.pendings, accepter.id);
    push_unique(&mut accepter.friends.accepted, requester.stub());
    push_unique(&mut requester.friends.accepted, accepter.stub());
    requester
        .notifications
        .push(Notification::new(NotificationKind::FriendAccepted, accepter.stub()));
    Ok(())
}

/// Requested → None, whichever of the two users sent the request.
pub fn withdraw(a: &mut User, b: &mut User) -> std::result::Result<(), FriendshipError> {
    if a.id == b.id {
        return Err(FriendshipError::InvalidRequest);
    }
    let (requester, target) = if is_pending(a, b) {
        (a, b)
    } else if is_pending(b, a) {
        (b, a)
    } else {
        return Err(FriendshipError::NoSuchRequest);
    };

    remove(&mut requester.friends.pendings, target.id);
    remove(&mut target.friends.requests, requester.id);
    Ok(())
}

/// Drops every reference to `peer` from `user`'s friend lists.
pub fn forget(user: &mut User, peer: UserId) {
    remove(&mut user.friends.requests, peer);
    remove(&mut user.friends.pendings, peer);
    remove(&mut user.friends.accepted, peer);
}

pub struct FriendManager {
    users: Arc<dyn UserRepo>,
    bus: Arc<dyn EventBus>,
    retry: RetryPolicy,
}

impl FriendManager {
    pub fn new(users: Arc<dyn UserRepo>, bus: Arc<dyn EventBus>, retry: RetryPolicy) -> Self {
        Self { users, bus, retry }
    }

    async fn load(&self, id: UserId) -> Result<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn transition(&self, caller: UserId, peer: UserId, topic: Topic, apply: Transition) -> Result<Friends> {
        if caller == peer {
            return Err(FriendshipError::InvalidRequest.into());
        }

        let me = self
            .retry
            .run(move || async move {
                let mut me = self.load(caller).await?;
                let mut other = self.load(peer).await?;
                apply(&mut me, &mut other)?;
                self.users
                    .save_users(vec![me, other])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::Internal("store returned no documents".into()))
            })
            .await?;

        info!(%caller, %peer, %topic, "friend transition applied");
        let friends = me.friends.clone();
        self.bus.publish(DomainEvent::Friend {
            topic,
            actor: me,
            counterpart: peer,
        });
        Ok(friends)
    }

    #[tracing::instrument(skip(self))]
    pub async fn make_request(&self, caller: UserId, friend: UserId) -> Result<Friends> {
        self.transition(caller, friend, Topic::FriendRequested, request).await
    }

    /// The caller accepts the request `friend` sent them.
    #[tracing::instrument(skip(self))]
    pub async fn accept_request(&self, caller: UserId, friend: UserId) -> Result<Friends> {
        self.transition(caller, friend, Topic::FriendAccepted, accept).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_request(&self, caller: UserId, friend: UserId) -> Result<Friends> {
        self.transition(caller, friend, Topic::FriendCancelled, withdraw).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn decline_request(&self, caller: UserId, friend: UserId) -> Result<Friends> {
        self.transition(caller, friend, Topic::FriendDeclined, withdraw).await
    }

    pub async fn friends(&self, caller: UserId) -> Result<Friends> {
        Ok(self.load(caller).await?.friends)
    }

    /// Resets the caller's friend lists and removes the caller from every
    /// counterpart's lists. Returns how many counterparts were cleaned;
    /// references to deleted users are dropped without being counted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all(&self, caller: UserId) -> Result<usize> {
        self.retry
            .run(move || async move {
                let mut me = self.load(caller).await?;
                let peers = me.friends.peer_ids();

                let mut docs = Vec::with_capacity(peers.len() + 1);
                for id in &peers {
                    match self.users.find_user(*id).await? {
                        Some(mut peer) => {
                            forget(&mut peer, caller);
                            docs.push(peer);
                        }
                        None => warn!(peer = %id, "counterpart no longer exists, skipping"),
                    }
                }

                let removed = docs.len();
                me.friends = Friends::default();
                docs.insert(0, me);
                self.users.save_users(docs).await?;
                Ok::<_, AppError>(removed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), "hash".into())
    }

    fn ids(list: &[PeerStub]) -> Vec<UserId> {
        list.iter().map(|s| s.id).collect()
    }

    #[test]
    fn request_records_both_sides() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();

        assert_eq!(ids(&a.friends.pendings), vec![b.id]);
        assert_eq!(ids(&b.friends.requests), vec![a.id]);
        assert!(a.friends.accepted.is_empty() && b.friends.accepted.is_empty());
        assert_eq!(b.notifications.len(), 1);
        assert_eq!(b.notifications[0].kind, NotificationKind::FriendRequest);
    }

    #[test]
    fn self_request_is_invalid() {
        let mut a = user("alice");
        let mut copy = a.clone();
        assert_eq!(request(&mut a, &mut copy), Err(FriendshipError::InvalidRequest));
    }

    #[test]
    fn duplicate_and_reverse_requests_are_rejected() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();

        assert_eq!(request(&mut a, &mut b), Err(FriendshipError::AlreadyPending));
        assert_eq!(request(&mut b, &mut a), Err(FriendshipError::IncomingRequestExists));
    }

    #[test]
    fn accept_moves_both_stubs_to_accepted() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();
        accept(&mut b, &mut a).unwrap();

        assert_eq!(ids(&a.friends.accepted), vec![b.id]);
        assert_eq!(ids(&b.friends.accepted), vec![a.id]);
        assert!(a.friends.pendings.is_empty());
        assert!(b.friends.requests.is_empty());
        assert_eq!(request(&mut a, &mut b), Err(FriendshipError::AlreadyFriends));
        assert_eq!(a.notifications.last().map(|n| n.kind), Some(NotificationKind::FriendAccepted));
    }

    #[test]
    fn requester_cannot_accept_own_request() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();
        assert_eq!(accept(&mut a, &mut b), Err(FriendshipError::NoSuchRequest));
    }

    #[test]
    fn accept_requires_both_sides_to_agree() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();
        // pending side lost its record
        a.friends.pendings.clear();
        assert_eq!(accept(&mut b, &mut a), Err(FriendshipError::NoSuchRequest));
    }

    #[test]
    fn withdraw_works_from_either_side_and_only_once() {
        let (mut a, mut b) = (user("alice"), user("bobby"));
        request(&mut a, &mut b).unwrap();
        withdraw(&mut b, &mut a).unwrap();

        assert!(a.friends.is_empty() && b.friends.is_empty());
        assert_eq!(withdraw(&mut a, &mut b), Err(FriendshipError::NoSuchRequest));
    }

    #[test]
    fn forget_clears_every_list() {
        let (mut a, mut b, mut c) = (user("alice"), user("bobby"), user("carol"));
        request(&mut a, &mut b).unwrap();
        request(&mut c, &mut a).unwrap();

        forget(&mut a, b.id);
        forget(&mut a, c.id);
        assert!(a.friends.is_empty());
    }
}
