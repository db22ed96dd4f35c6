//! Subscription streams over the broadcast bus.
//!
//! Every stream only yields events whose counterpart is the subscriber.

use async_graphql::{Context, Result, Subscription};
use cf_core::{DomainEvent, Topic};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use super::types::{FriendEvent, MessageEvent};
use super::viewer;
use crate::bus::BroadcastBus;

fn events_for(ctx: &Context<'_>, topic: Topic) -> Result<impl Stream<Item = DomainEvent>> {
    let subscriber = viewer(ctx)?;
    let bus = ctx.data::<BroadcastBus>()?;

    Ok(BroadcastStream::new(bus.subscribe()).filter_map(move |item| async move {
        match item {
            Ok(event) if event.topic() == topic && event.counterpart() == subscriber => Some(event),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%subscriber, %topic, error = %err, "subscriber lagged, events dropped");
                None
            }
        }
    }))
}

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    async fn friend_requested(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = FriendEvent>> {
        Ok(events_for(ctx, Topic::FriendRequested)?.map(FriendEvent::from))
    }

    async fn friend_accepted(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = FriendEvent>> {
        Ok(events_for(ctx, Topic::FriendAccepted)?.map(FriendEvent::from))
    }

    async fn friend_cancelled(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = FriendEvent>> {
        Ok(events_for(ctx, Topic::FriendCancelled)?.map(FriendEvent::from))
    }

    async fn friend_declined(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = FriendEvent>> {
        Ok(events_for(ctx, Topic::FriendDeclined)?.map(FriendEvent::from))
    }

    async fn message_sent(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = MessageEvent>> {
        Ok(events_for(ctx, Topic::MessageSent)?.filter_map(|event| async move { MessageEvent::from_event(event) }))
    }
}
