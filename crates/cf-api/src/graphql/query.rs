use std::sync::Arc;

use async_graphql::{Context, Object, Result};
use cf_core::{AccountService, FeedService, FriendManager, ThreadResolver};
use uuid::Uuid;

use super::error::GqlResultExt;
use super::types::{Friends, Notification, Post, Thread, User};
use super::viewer;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The authenticated caller
    async fn me(&self, ctx: &Context<'_>) -> Result<User> {
        let caller = viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        Ok(accounts.me(caller).await.gql()?.into())
    }

    async fn all_users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        let users = accounts.all_users().await.gql()?;
        Ok(users.into_iter().map(User::from).collect())
    }

    /// Search by `name` (substring), `email` or `phone`.
    async fn find_user(&self, ctx: &Context<'_>, field: String, value: String) -> Result<Vec<User>> {
        viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        let users = accounts.find_by_field(&field, &value).await.gql()?;
        Ok(users.into_iter().map(User::from).collect())
    }

    async fn get_friends(&self, ctx: &Context<'_>) -> Result<Friends> {
        let caller = viewer(ctx)?;
        let friends = ctx.data::<Arc<FriendManager>>()?;
        Ok(friends.friends(caller).await.gql()?.into())
    }

    /// The caller's thread with `receiver_id`
    async fn get_conversation(&self, ctx: &Context<'_>, receiver_id: Uuid) -> Result<Thread> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        Ok(threads.conversation(caller, receiver_id).await.gql()?.into())
    }

    async fn conversations(&self, ctx: &Context<'_>) -> Result<Vec<Thread>> {
        let caller = viewer(ctx)?;
        let threads = ctx.data::<Arc<ThreadResolver>>()?;
        let list = threads.conversations(caller).await.gql()?;
        Ok(list.into_iter().map(Thread::from).collect())
    }

    async fn feed(&self, ctx: &Context<'_>) -> Result<Vec<Post>> {
        let caller = viewer(ctx)?;
        let feed = ctx.data::<Arc<FeedService>>()?;
        let posts = feed.feed(caller).await.gql()?;
        Ok(posts.into_iter().map(Post::from).collect())
    }

    async fn notifications(&self, ctx: &Context<'_>) -> Result<Vec<Notification>> {
        let caller = viewer(ctx)?;
        let accounts = ctx.data::<Arc<AccountService>>()?;
        let list = accounts.notifications(caller).await.gql()?;
        Ok(list.into_iter().map(Notification::from).collect())
    }
}
