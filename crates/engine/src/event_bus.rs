// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Bus: single-process pub/sub fan-out to N
//! subscribers with bounded per-subscriber buffering. `tokio::sync::broadcast`
//! is the natural fit here — the broadcaster never blocks, and a subscriber
//! that falls more than `CAPACITY` events behind observes `Lagged(n)` on its
//! next `recv()` instead of the broadcaster stalling.

use lazyaf_core::Event;
use tokio::sync::broadcast;

/// Minimum per-subscriber queue depth.
pub const CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Fan-out; never blocks. Errors only when there are zero subscribers,
    /// which is not a failure from the broadcaster's point of view.
    pub fn broadcast(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// A lazy per-subscriber queue. Each subscriber owns its own cursor into
    /// the ring buffer, so one slow UI client cannot starve another.
    pub fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

/// One accepted event, or a marker that this subscriber fell behind and
/// silently dropped the oldest events in between.
#[derive(Debug)]
pub enum Delivery {
    Event(Event),
    Lagged(u64),
}

impl Subscription {
    /// FIFO of accepted events for this subscriber; cross-subscriber ordering is not guaranteed.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(Delivery::Event(event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Some(Delivery::Lagged(skipped))
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
