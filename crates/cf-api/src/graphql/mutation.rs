use std::sync::Arc;

use async_graphql::{Context, Object, Result};
use cf_core::{AccountService, FeedService, FriendManager, NewPost, ThreadResolver};
use uuid::Uuid;

use super::error::GqlResultExt;
use super::types::{
    AuthPayload, Confirmation, Entry, Friends, PostInput, Post, ProfileInput, RegisterInput, Thread, User,
};
use super::viewer;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    // ── Accounts ─────────────────────────────────────────────────────────────

    /// Creates an inactive account and emails a confirmation code.
    async fn register(&self, ctx: &Context<'_>, input: RegisterInput) -> Result<User> {
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.register(input.into()).await.gql()?.into())
    }

    async fn confirm_registration(&self, ctx: &Context<'_>, email: String, code: String) -> Result<User> {
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.confirm(&email, &code).await.gql()?.into())
    }

    /// Mails a new confirmation code to an account that is not active yet.
    async fn resend_confirmation_code(&self, ctx: &Context<'_>, email: String) -> Result<User> {
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.resend_code(&email).await.gql()?.into())
    }

    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthPayload> {
        let accounts = ctx.data::<Arc<AccountService>>()?;
        let (token, user) = accounts.login(&email, &password).await.gql()?;
        Ok(AuthPayload {
            token,
            user: user.into(),
        })
    }

    async fn update_profile(&self, ctx: &Context<'_>, input: ProfileInput) -> Result<User> {
        let caller = viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.update_profile(caller, input.into()).await.gql()?.into())
    }

    async fn clear_notifications(&self, ctx: &Context<'_>) -> Result<User> {
        let caller = viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.clear_notifications(caller).await.gql()?.into())
    }

    // ── Friends ──────────────────────────────────────────────────────────────

    async fn make_friend_request(&self, ctx: &Context<'_>, friend_id: Uuid) -> Result<Friends> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        Ok(friends.make_request(caller, friend_id).await.gql()?.into())
    }

    /// Accepts the request `friend_id` sent to the caller.
    async fn accept_friend_request(&self, ctx: &Context<'_>, friend_id: Uuid) -> Result<Friends> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        Ok(friends.accept_request(caller, friend_id).await.gql()?.into())
    }

    async fn cancel_friend_request(&self, ctx: &Context<'_>, friend_id: Uuid) -> Result<Friends> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        Ok(friends.cancel_request(caller, friend_id).await.gql()?.into())
    }

    async fn decline_friend_request(&self, ctx: &Context<'_>, friend_id: Uuid) -> Result<Friends> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        Ok(friends.decline_request(caller, friend_id).await.gql()?.into())
    }

    async fn delete_all_friends(&self, ctx: &Context<'_>) -> Result<Confirmation> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        let removed = friends.delete_all(caller).await.gql()?;
        Ok(Confirmation {
            success: true,
            message: "all friends have been removed".into(),
            removed: i32::try_from(removed).unwrap_or(i32::MAX),
        })
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Returns the sender's saved aggregate.
    async fn send_message(&self, ctx: &Context<'_>, receiver_id: Uuid, content: String) -> Result<User> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        Ok(threads.send(caller, receiver_id, &content).await.gql()?.into())
    }

    async fn clear_all_messages(&self, ctx: &Context<'_>) -> Result<User> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        Ok(threads.clear_all(caller).await.gql()?.into())
    }

    /// Empties the thread's inbox, keeping the thread.
    async fn delete_conversation(&self, ctx: &Context<'_>, thread_id: Uuid) -> Result<User> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        Ok(threads.delete_conversation(caller, thread_id).await.gql()?.into())
    }

    async fn clear_message_history(&self, ctx: &Context<'_>, thread_id: Uuid) -> Result<Vec<Thread>> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        let remaining = threads.clear_history(caller, thread_id).await.gql()?;
        Ok(remaining.into_iter().map(Thread::from).collect())
    }

    async fn delete_one_message(&self, ctx: &Context<'_>, thread_id: Uuid, entry_id: Uuid) -> Result<Vec<Entry>> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        let inbox = threads.delete_one(caller, thread_id, entry_id).await.gql()?;
        Ok(inbox.into_iter().map(Entry::from).collect())
    }

    async fn delete_batch_messages(
        &self,
        ctx: &Context<'_>,
        thread_id: Uuid,
        entry_ids: Vec<Uuid>,
    ) -> Result<Thread> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        Ok(threads.delete_batch(caller, thread_id, entry_ids).await.gql()?.into())
    }

    // ── Feed ─────────────────────────────────────────────────────────────────

    async fn create_post(&self, ctx: &Context<'_>, input: PostInput) -> Result<Post> {
        let caller = viewer(ctx)?;
        let feed = ctx.data::<Arc<FeedService>>()?;
        let post = NewPost {
            content: input.content,
            media: input.media,
        };
        Ok(feed.create_post(caller, post).await.gql()?.into())
    }

    async fn like_post(&self, ctx: &Context<'_>, post_id: Uuid) -> Result<Post> {
        let caller = viewer(ctx)?;
        let feed = ctx.data::<Arc<FeedService>>()?;
        Ok(feed.like(caller, post_id).await.gql()?.into())
    }

    async fn unlike_post(&self, ctx: &Context<'_>, post_id: Uuid) -> Result<Post> {
        let caller = viewer(ctx)?;
        let feed = ctx.data::<Arc<FeedService>>()?;
        Ok(feed.unlike(caller, post_id).await.gql()?.into())
    }

    async fn comment_on_post(&self, ctx: &Context<'_>, post_id: Uuid, content: String) -> Result<Post> {
        let caller = viewer(ctx)?;
        let feed = ctx.data::<Arc<FeedService>>()?;
        Ok(feed.comment(caller, post_id, &content).await.gql()?.into())
    }
}
