//! Purpose: Satisfy realtime-channel call sites without any message delivery.
//! Exports: `ChannelBuilder`, `Channel`, `SubscribeStatus`.
//! Role: Constant-response stand-in; registration is accepted, delivery never happens.
//! Invariants: `subscribe` always reports `Subscribed` on a deferred callback.
//! Invariants: `track`/`send` always succeed; presence state is always empty.

use serde_json::{Map, Value};

use crate::core::defer;
use crate::core::error::Error;

/// Subscription outcomes a call site may match on. The stub only ever emits
/// `Subscribed`; the remaining variants exist so application match arms
/// written against the real service still compile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscribeStatus {
    Subscribed,
    TimedOut,
    Closed,
    ChannelError,
}

pub struct ChannelBuilder {
    topic: String,
    registered: usize,
}

impl ChannelBuilder {
    pub(crate) fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            registered: 0,
        }
    }

    /// Accept an event registration. Handlers are counted and dropped: no
    /// cross-client traffic exists for them to observe.
    pub fn on(mut self, event: impl Into<String>, _handler: impl Fn(Value) + Send + 'static) -> Self {
        let event = event.into();
        tracing::debug!(topic = %self.topic, event = %event, "handler registered");
        self.registered += 1;
        self
    }

    /// Open the channel. The callback hears `Subscribed` on a later
    /// scheduling turn, mirroring the deferred acknowledgment of the real
    /// service.
    pub fn subscribe(self, callback: impl FnOnce(SubscribeStatus) + Send + 'static) -> Channel {
        tracing::debug!(topic = %self.topic, handlers = self.registered, "subscribe");
        tokio::spawn(async move {
            defer().await;
            callback(SubscribeStatus::Subscribed);
        });
        Channel { topic: self.topic }
    }
}

pub struct Channel {
    topic: String,
}

impl Channel {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn track(&self, _payload: Value) -> Result<(), Error> {
        defer().await;
        Ok(())
    }

    pub async fn send(&self, event: &str, _payload: Value) -> Result<(), Error> {
        defer().await;
        tracing::debug!(topic = %self.topic, event, "send (dropped)");
        Ok(())
    }

    /// Always empty: the fixture has exactly one logical client.
    pub fn presence_state(&self) -> Map<String, Value> {
        Map::new()
    }

    pub fn unsubscribe(self) {
        tracing::debug!(topic = %self.topic, "unsubscribe");
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelBuilder, SubscribeStatus};
    use serde_json::json;

    #[tokio::test]
    async fn subscribe_reports_success_deferred() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let channel = ChannelBuilder::new("room:rfi-42")
            .on("INSERT", |_payload| {})
            .on("UPDATE", |_payload| {})
            .subscribe(move |status| {
                let _ = tx.send(status);
            });
        assert_eq!(rx.await.expect("status"), SubscribeStatus::Subscribed);
        assert_eq!(channel.topic(), "room:rfi-42");
    }

    #[tokio::test]
    async fn track_send_and_presence_are_constant() {
        let channel = ChannelBuilder::new("room:1").subscribe(|_| {});
        channel.track(json!({"user": "u1"})).await.expect("track");
        channel
            .send("cursor", json!({"x": 3}))
            .await
            .expect("send");
        assert!(channel.presence_state().is_empty());
        channel.unsubscribe();
    }
}
