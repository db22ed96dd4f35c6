//! # Message Thread Resolver
//!
//! Every participant of a conversation keeps their own `Thread` copy inside
//! their user document. Sending appends the same `Entry` to both copies,
//! creating whichever copy is missing. All other operations touch only the
//! caller's copy.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::events::DomainEvent;
use crate::models::{Entry, EntryId, Notification, NotificationKind, Thread, ThreadId, User, UserId};
use crate::retry::RetryPolicy;
use crate::traits::{EventBus, UserRepo};
use crate::validation::Validator;

/// Index of the thread `owner` keeps with `peer`.
pub fn find_thread(owner: &User, peer: UserId) -> Option<usize> {
    owner
        .messages
        .iter()
        .position(|thread| thread.involves_pair(owner.id, peer))
}

/// Appends `entry` to the thread between `sender` and `receiver` on both
/// sides, creating a side's thread when it has none yet.
pub fn deliver(sender: &mut User, receiver: &mut User, entry: Entry) {
    let sender_stub = sender.stub();
    let receiver_stub = receiver.stub();

    for (owner, peer) in [(&mut *sender, receiver_stub.id), (&mut *receiver, sender_stub.id)] {
        match find_thread(owner, peer) {
            Some(index) => owner.messages[index].inbox.push(entry.clone()),
            None => owner.messages.push(Thread {
                id: Uuid::now_v7(),
                sender: sender_stub.clone(),
                receiver: receiver_stub.clone(),
                inbox: vec![entry.clone()],
            }),
        }
    }

    receiver
        .notifications
        .push(Notification::new(NotificationKind::Message, sender_stub));
}

fn thread_mut(owner: &mut User, thread_id: ThreadId) -> Result<&mut Thread> {
    owner
        .messages
        .iter_mut()
        .find(|thread| thread.id == thread_id)
        .ok_or_else(|| AppError::not_found("Thread", thread_id))
}

/// Removes the listed entries from a thread, all or nothing.
pub fn remove_entries(owner: &mut User, thread_id: ThreadId, entry_ids: &[EntryId]) -> Result<()> {
    let thread = thread_mut(owner, thread_id)?;
    if let Some(missing) = entry_ids
        .iter()
        .find(|id| !thread.inbox.iter().any(|entry| entry.id == **id))
    {
        return Err(AppError::not_found("Entry", missing));
    }

    let doomed: HashSet<&EntryId> = entry_ids.iter().collect();
    thread.inbox.retain(|entry| !doomed.contains(&entry.id));
    Ok(())
}

pub struct ThreadResolver {
    users: Arc<dyn UserRepo>,
    bus: Arc<dyn EventBus>,
    retry: RetryPolicy,
}

impl ThreadResolver {
    pub fn new(users: Arc<dyn UserRepo>, bus: Arc<dyn EventBus>, retry: RetryPolicy) -> Self {
        Self { users, bus, retry }
    }

    async fn load(&self, id: UserId) -> Result<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn save(&self, user: User) -> Result<User> {
        self.users
            .save_users(vec![user])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("store returned no documents".into()))
    }

    /// Load the caller, edit, save; retried on version conflicts.
    async fn edit<T, F>(&self, caller: UserId, edit: F) -> Result<(User, T)>
    where
        F: Fn(&mut User) -> Result<T> + Send + Sync,
        T: Send,
    {
        let edit = &edit;
        self.retry
            .run(move || async move {
                let mut me = self.load(caller).await?;
                let out = edit(&mut me)?;
                Ok::<_, AppError>((self.save(me).await?, out))
            })
            .await
    }

    /// Delivers `content` from `sender` to `receiver`; returns the sender as saved.
    #[tracing::instrument(skip(self, content))]
    pub async fn send(&self, sender: UserId, receiver: UserId, content: &str) -> Result<User> {
        Validator::new()
            .required("content", content)
            .check("receiverId", sender != receiver, "you cannot send a message to yourself")
            .finish()?;

        // fixed before the retry loop so every attempt delivers the same entry
        let (entry_id, sent_at) = (Uuid::now_v7(), Utc::now());
        let (me, entry) = self
            .retry
            .run(move || async move {
                let mut me = self.load(sender).await?;
                let mut other = self.load(receiver).await?;
                let entry = Entry {
                    id: entry_id,
                    sender: me.stub(),
                    content: content.to_string(),
                    sent_at,
                };
                deliver(&mut me, &mut other, entry.clone());
                let me = self
                    .users
                    .save_users(vec![me, other])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::Internal("store returned no documents".into()))?;
                Ok((me, entry))
            })
            .await?;

        info!(%sender, %receiver, entry = %entry.id, "message delivered");
        self.bus.publish(DomainEvent::MessageSent {
            actor: me.clone(),
            counterpart: receiver,
            entry,
        });
        Ok(me)
    }

    pub async fn conversation(&self, caller: UserId, peer: UserId) -> Result<Thread> {
        let me = self.load(caller).await?;
        find_thread(&me, peer)
            .map(|index| me.messages[index].clone())
            .ok_or_else(|| AppError::not_found("Thread", peer))
    }

    pub async fn conversations(&self, caller: UserId) -> Result<Vec<Thread>> {
        Ok(self.load(caller).await?.messages)
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self, caller: UserId) -> Result<User> {
        let (me, _) = self
            .edit(caller, |me| {
                me.messages.clear();
                Ok(())
            })
            .await?;
        Ok(me)
    }

    /// Empties a thread's inbox but keeps the thread.
    #[tracing::instrument(skip(self))]
    pub async fn delete_conversation(&self, caller: UserId, thread_id: ThreadId) -> Result<User> {
        let (me, _) = self
            .edit(caller, |me| {
                thread_mut(me, thread_id)?.inbox.clear();
                Ok(())
            })
            .await?;
        Ok(me)
    }

    /// Removes the thread record; returns the remaining threads.
    #[tracing::instrument(skip(self))]
    pub async fn clear_history(&self, caller: UserId, thread_id: ThreadId) -> Result<Vec<Thread>> {
        let (me, _) = self
            .edit(caller, |me| {
                let before = me.messages.len();
                me.messages.retain(|thread| thread.id != thread_id);
                if me.messages.len() == before {
                    return Err(AppError::not_found("Thread", thread_id));
                }
                Ok(())
            })
            .await?;
        Ok(me.messages)
    }

    /// Removes one entry; returns the remaining inbox.
    #[tracing::instrument(skip(self))]
    pub async fn delete_one(&self, caller: UserId, thread_id: ThreadId, entry_id: EntryId) -> Result<Vec<Entry>> {
        let (_, inbox) = self
            .edit(caller, |me| {
                remove_entries(me, thread_id, &[entry_id])?;
                Ok(thread_mut(me, thread_id)?.inbox.clone())
            })
            .await?;
        Ok(inbox)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_batch(&self, caller: UserId, thread_id: ThreadId, entry_ids: Vec<EntryId>) -> Result<Thread> {
        let (_, thread) = self
            .edit(caller, |me| {
                remove_entries(me, thread_id, &entry_ids)?;
                Ok(thread_mut(me, thread_id)?.clone())
            })
            .await?;
        Ok(thread)
    }
}
