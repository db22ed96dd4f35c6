//! In-process `EventBus` backed by a `tokio::sync::broadcast` channel.

use cf_core::{DomainEvent, EventBus};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastBus {
    /// `capacity` bounds how far a slow subscriber may lag before it drops events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: DomainEvent) {
        let topic = event.topic();
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(%topic, receivers, "event published"),
            // nobody subscribed
            Err(_) => tracing::trace!(%topic, "event published without subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::{Topic, User};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = BroadcastBus::new(8);
        let mut rx = bus.subscribe();
        let actor = User::new("alice".into(), "alice@example.com".into(), "h".into());
        let counterpart = Uuid::now_v7();

        bus.publish(DomainEvent::Friend {
            topic: Topic::FriendRequested,
            actor,
            counterpart,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic(), Topic::FriendRequested);
        assert_eq!(event.counterpart(), counterpart);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = BroadcastBus::new(8);
        let actor = User::new("alice".into(), "alice@example.com".into(), "h".into());
        bus.publish(DomainEvent::Friend {
            topic: Topic::FriendDeclined,
            actor,
            counterpart: Uuid::now_v7(),
        });
    }
}
