//! Shared fixtures: in-memory stores, a recording bus and port doubles.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use cf_core::{
    AppError, DomainEvent, EventBus, FeedService, FriendManager, MockAuthProvider, MockMailer, PeerStub,
    RegistrationStatus, RetryPolicy, ThreadResolver, Topic, User, UserId, UserRepo,
};
use cf_db_memory::{MemoryPostStore, MemoryUserStore};
use uuid::Uuid;

/// Keeps every published event for later assertions.
#[derive(Default)]
pub struct RecordingBus {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingBus {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.events().iter().map(DomainEvent::topic).collect()
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct World {
    pub users: Arc<MemoryUserStore>,
    pub posts: Arc<MemoryPostStore>,
    pub bus: Arc<RecordingBus>,
}

impl World {
    pub fn new() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            posts: Arc::new(MemoryPostStore::new()),
            bus: Arc::new(RecordingBus::default()),
        }
    }

    pub fn friends(&self) -> FriendManager {
        FriendManager::new(self.users.clone(), self.bus.clone(), RetryPolicy::default())
    }

    pub fn threads(&self) -> ThreadResolver {
        ThreadResolver::new(self.users.clone(), self.bus.clone(), RetryPolicy::default())
    }

    pub fn feed(&self) -> FeedService {
        FeedService::new(self.users.clone(), self.posts.clone(), RetryPolicy::default())
    }

    /// An active account stored directly, skipping registration.
    pub async fn seed(&self, name: &str) -> User {
        let mut user = User::new(name.to_string(), format!("{name}@example.com"), "hashed:password".into());
        user.status = RegistrationStatus::Active;
        self.users.insert_user(user).await.unwrap()
    }

    pub async fn reload(&self, id: UserId) -> User {
        self.users.find_user(id).await.unwrap().expect("user exists")
    }
}

pub fn ids(list: &[PeerStub]) -> Vec<UserId> {
    list.iter().map(|stub| stub.id).collect()
}

/// Passwords hash to `hashed:<password>`, tokens are the bare user id and
/// every confirmation code is `123456`.
pub fn fake_auth() -> MockAuthProvider {
    let mut auth = MockAuthProvider::new();
    auth.expect_hash_password()
        .returning(|password| Ok(format!("hashed:{password}")));
    auth.expect_verify_password()
        .returning(|password, hash| hash == format!("hashed:{password}"));
    auth.expect_issue_token().returning(|id| Ok(id.to_string()));
    auth.expect_verify_token()
        .returning(|token| Uuid::parse_str(token).map_err(|_| AppError::Unauthorized("bad token".into())));
    auth.expect_generate_confirmation_code()
        .returning(|| Ok("123456".to_string()));
    auth
}

/// A mailer that accepts everything.
pub fn quiet_mailer() -> MockMailer {
    let mut mailer = MockMailer::new();
    mailer.expect_send_confirmation_code().returning(|_, _, _| Ok(()));
    mailer.expect_send_welcome().returning(|_, _| Ok(()));
    mailer
}
