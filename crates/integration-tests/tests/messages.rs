mod common;

use cf_core::{AppError, DomainEvent, NotificationKind, Topic};
use common::World;
use uuid::Uuid;

fn field_errors(err: AppError) -> Vec<String> {
    match err {
        AppError::ValidationError(errors) => errors.fields().into_iter().map(str::to_string).collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn first_message_creates_one_thread_per_side() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);

    let saved = world.threads().send(a.id, b.id, "hi").await.unwrap();
    assert_eq!(saved.id, a.id);

    let (a, b) = (world.reload(a.id).await, world.reload(b.id).await);
    for side in [&a, &b] {
        assert_eq!(side.messages.len(), 1);
        assert_eq!(side.messages[0].inbox.len(), 1);
        assert_eq!(side.messages[0].inbox[0].content, "hi");
    }
    assert_eq!(a.messages[0].inbox[0].id, b.messages[0].inbox[0].id);
    assert!(b.notifications.iter().any(|n| n.kind == NotificationKind::Message));
}

#[tokio::test]
async fn second_message_appends_instead_of_creating_a_thread() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);
    let threads = world.threads();

    threads.send(a.id, b.id, "hi").await.unwrap();
    threads.send(a.id, b.id, "yo").await.unwrap();
    threads.send(b.id, a.id, "hey back").await.unwrap();

    let (a, b) = (world.reload(a.id).await, world.reload(b.id).await);
    assert_eq!(a.messages.len(), 1);
    assert_eq!(b.messages.len(), 1);
    assert_eq!(a.messages[0].inbox.len(), 3);
    assert_eq!(b.messages[0].inbox.len(), 3);
    let contents: Vec<_> = a.messages[0].inbox.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "yo", "hey back"]);
}

#[tokio::test]
async fn message_sent_event_targets_the_receiver() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);

    world.threads().send(a.id, b.id, "hi").await.unwrap();

    let events = world.bus.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        DomainEvent::MessageSent {
            actor,
            counterpart,
            entry,
        } => {
            assert_eq!(actor.id, a.id);
            assert_eq!(*counterpart, b.id);
            assert_eq!(entry.content, "hi");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(events[0].topic(), Topic::MessageSent);
}

#[tokio::test]
async fn empty_content_and_self_messages_are_rejected() {
    let world = World::new();
    let a = world.seed("alice").await;

    let err = world.threads().send(a.id, a.id, "   ").await.unwrap_err();
    assert_eq!(field_errors(err), vec!["content", "receiverId"]);
    assert!(world.reload(a.id).await.messages.is_empty());
}

#[tokio::test]
async fn unknown_receiver_is_not_found() {
    let world = World::new();
    let a = world.seed("alice").await;

    let err = world.threads().send(a.id, Uuid::now_v7(), "hi").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
    assert!(world.bus.events().is_empty());
}

#[tokio::test]
async fn delete_one_message_only_touches_the_callers_copy() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);
    let threads = world.threads();
    threads.send(a.id, b.id, "hi").await.unwrap();
    threads.send(a.id, b.id, "yo").await.unwrap();

    let thread = threads.conversation(a.id, b.id).await.unwrap();
    let first = thread.inbox[0].id;

    let remaining = threads.delete_one(a.id, thread.id, first).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "yo");

    let b_thread = threads.conversation(b.id, a.id).await.unwrap();
    assert_eq!(b_thread.inbox.len(), 2);

    let err = threads.delete_one(a.id, thread.id, first).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref kind, _) if kind == "Entry"));
}

#[tokio::test]
async fn delete_batch_is_all_or_nothing() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);
    let threads = world.threads();
    for text in ["one", "two", "three"] {
        threads.send(a.id, b.id, text).await.unwrap();
    }
    let thread = threads.conversation(a.id, b.id).await.unwrap();
    let entry_ids: Vec<_> = thread.inbox.iter().map(|e| e.id).collect();

    let err = threads
        .delete_batch(a.id, thread.id, vec![entry_ids[0], Uuid::now_v7()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref kind, _) if kind == "Entry"));
    assert_eq!(threads.conversation(a.id, b.id).await.unwrap().inbox.len(), 3);

    let thread = threads
        .delete_batch(a.id, thread.id, vec![entry_ids[0], entry_ids[2]])
        .await
        .unwrap();
    assert_eq!(thread.inbox.len(), 1);
    assert_eq!(thread.inbox[0].content, "two");
}

#[tokio::test]
async fn delete_conversation_keeps_the_thread_record() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);
    let threads = world.threads();
    threads.send(a.id, b.id, "hi").await.unwrap();
    let thread_id = threads.conversation(a.id, b.id).await.unwrap().id;

    let me = threads.delete_conversation(a.id, thread_id).await.unwrap();
    assert_eq!(me.messages.len(), 1);
    assert!(me.messages[0].inbox.is_empty());

    // a new message lands in the emptied thread
    threads.send(b.id, a.id, "still there?").await.unwrap();
    let thread = threads.conversation(a.id, b.id).await.unwrap();
    assert_eq!(thread.id, thread_id);
    assert_eq!(thread.inbox.len(), 1);
}

#[tokio::test]
async fn clear_history_removes_the_thread() {
    let world = World::new();
    let (a, b, c) = (world.seed("alice").await, world.seed("bobby").await, world.seed("carol").await);
    let threads = world.threads();
    threads.send(a.id, b.id, "to b").await.unwrap();
    threads.send(a.id, c.id, "to c").await.unwrap();
    let with_b = threads.conversation(a.id, b.id).await.unwrap().id;

    let remaining = threads.clear_history(a.id, with_b).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].involves_pair(a.id, c.id));

    let err = threads.conversation(a.id, b.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref kind, _) if kind == "Thread"));
    assert_eq!(threads.conversations(b.id).await.unwrap().len(), 1);

    let err = threads.clear_history(a.id, with_b).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}

#[tokio::test]
async fn clear_all_messages_is_caller_scoped() {
    let world = World::new();
    let (a, b) = (world.seed("alice").await, world.seed("bobby").await);
    let threads = world.threads();
    threads.send(a.id, b.id, "hi").await.unwrap();

    let me = threads.clear_all(a.id).await.unwrap();
    assert!(me.messages.is_empty());
    assert_eq!(world.reload(b.id).await.messages.len(), 1);
}

#[tokio::test]
async fn unknown_thread_ids_are_not_found() {
    let world = World::new();
    let a = world.seed("alice").await;
    let threads = world.threads();
    let ghost = Uuid::now_v7();

    assert!(matches!(
        threads.delete_conversation(a.id, ghost).await,
        Err(AppError::NotFound(..))
    ));
    assert!(matches!(
        threads.delete_one(a.id, ghost, Uuid::now_v7()).await,
        Err(AppError::NotFound(..))
    ));
    assert!(matches!(
        threads.delete_batch(a.id, ghost, vec![]).await,
        Err(AppError::NotFound(..))
    ));
}
