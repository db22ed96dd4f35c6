//! GraphQL API
//!
//! - [`QueryRoot`]: reads scoped to the authenticated caller
//! - [`MutationRoot`]: accounts, friend protocol, messaging, feed
//! - [`SubscriptionRoot`]: per-recipient event streams over WebSocket

mod error;
mod mutation;
mod query;
mod subscription;
pub mod types;

pub use error::{code, unauthenticated, GqlResultExt, IntoGraphqlError};
pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;

use std::sync::Arc;

use async_graphql::{Context, Schema};
use cf_core::{
    AccountService, AuthProvider, EventBus, FeedService, FriendManager, Mailer, PostRepo, RetryPolicy,
    ThreadResolver, UserId, UserRepo,
};

use crate::bus::BroadcastBus;

pub type ConnectifySchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Identity of the caller for one request or WebSocket connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer(pub Option<UserId>);

impl Viewer {
    /// Resolves `Bearer <jwt>` (or a bare token). Invalid tokens give an
    /// anonymous viewer; operations that need a caller reject it later.
    pub fn from_bearer(auth: &dyn AuthProvider, header: Option<&str>) -> Self {
        let Some(raw) = header.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Viewer(None);
        };
        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw);

        match auth.verify_token(token) {
            Ok(id) => Viewer(Some(id)),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring invalid bearer token");
                Viewer(None)
            }
        }
    }
}

/// The authenticated caller, or `UNAUTHENTICATED`.
pub(crate) fn viewer(ctx: &Context<'_>) -> async_graphql::Result<UserId> {
    ctx.data_opt::<Viewer>()
        .and_then(|viewer| viewer.0)
        .ok_or_else(unauthenticated)
}

/// The domain services the resolvers call into.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<AccountService>,
    pub friends: Arc<FriendManager>,
    pub threads: Arc<ThreadResolver>,
    pub feed: Arc<FeedService>,
}

impl Services {
    pub fn new(
        users: Arc<dyn UserRepo>,
        posts: Arc<dyn PostRepo>,
        auth: Arc<dyn AuthProvider>,
        mailer: Arc<dyn Mailer>,
        bus: Arc<dyn EventBus>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(users.clone(), auth, mailer, retry)),
            friends: Arc::new(FriendManager::new(users.clone(), bus.clone(), retry)),
            threads: Arc::new(ThreadResolver::new(users.clone(), bus, retry)),
            feed: Arc::new(FeedService::new(users, posts, retry)),
        }
    }
}

/// Build the schema with the services and the bus subscriptions read from.
pub fn build_schema(services: Services, bus: BroadcastBus) -> ConnectifySchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(services.accounts)
        .data(services.friends)
        .data(services.threads)
        .data(services.feed)
        .data(bus)
        .limit_depth(16)
        .finish()
}
