// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Hub (C10): topic-keyed fan-out of [`mc_core::Event`] to subscribers,
//! each with its own bounded `tokio::sync::broadcast` channel so a slow
//! subscriber drops its own oldest events rather than stalling publishers.

use std::collections::HashMap;

use mc_core::Event;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Per-subscriber channel capacity. A lagging subscriber's oldest unread
/// events are dropped once this fills; `Hub::subscribe` reports the drop
/// count via `broadcast::error::RecvError::Lagged` surfaced to callers.
const CHANNEL_CAPACITY: usize = 256;

pub struct Hub {
    topics: Mutex<HashMap<&'static str, broadcast::Sender<Event>>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self { topics: Mutex::new(HashMap::new()) }
    }

    /// Publish `event` to its topic. A no-op if nobody is subscribed.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        let topics = self.topics.lock();
        if let Some(sender) = topics.get(topic) {
            // No receivers is not an error condition for a fire-and-forget hub.
            let _ = sender.send(event);
        }
    }

    /// Subscribe to a single topic (e.g. `"tasks"`, `"gates"`, `"tokens"`).
    pub fn subscribe(&self, topic: &'static str) -> broadcast::Receiver<Event> {
        let mut topics = self.topics.lock();
        topics.entry(topic).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).subscribe()
    }

    /// Subscribe to every topic this hub has seen so far. New topics opened
    /// after this call are not included; callers that need "everything"
    /// should instead subscribe eagerly to the fixed topic set in
    /// `mc_core::Event::topic`'s documented range.
    pub fn subscribe_all(&self, known_topics: &[&'static str]) -> Vec<(&'static str, broadcast::Receiver<Event>)> {
        known_topics.iter().map(|topic| (*topic, self.subscribe(topic))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::{Stage, TaskStatus};

    #[tokio::test]
    async fn subscriber_receives_published_event_on_its_topic() {
        let hub = Hub::new();
        let mut rx = hub.subscribe("stage");
        hub.publish(Event::StageChanged { previous: Stage::Discovery, current: Stage::Goal });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::StageChanged { .. }));
    }

    #[tokio::test]
    async fn subscriber_on_a_different_topic_does_not_see_the_event() {
        let hub = Hub::new();
        let mut gates_rx = hub.subscribe("gates");
        hub.publish(Event::StageChanged { previous: Stage::Discovery, current: Stage::Goal });
        assert!(gates_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let hub = Hub::new();
        hub.publish(Event::TaskUpdated {
            task_id: mc_core::TaskId::from("mc-0000000000"),
            status: TaskStatus::Done,
            previous: TaskStatus::InProgress,
        });
    }

    #[tokio::test]
    async fn two_subscribers_on_the_same_topic_both_receive() {
        let hub = Hub::new();
        let mut rx_a = hub.subscribe("tokens");
        let mut rx_b = hub.subscribe("tokens");
        hub.publish(Event::TokenWarning { worker_id: mc_core::WorkerId::new(), used: 1, budget: 2 });
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }
}
