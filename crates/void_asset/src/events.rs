//! Store notifications
//!
//! Subscribers receive events over unbounded channels. Receivers that were
//! dropped are pruned on the next publish.

use crossbeam_channel::{Receiver, Sender};

use crate::uid::Uid;

/// Event published by the asset store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    /// A rebuild finished; UIDs whose build artifacts changed
    Rebuilt { changed: Vec<Uid> },
    /// The cache was cleared; entries still held by handles
    CacheCleared { retained: usize },
}

/// Fan-out list of subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<AssetEvent>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Receiver<AssetEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send an event to every live subscriber
    pub fn publish(&mut self, event: AssetEvent) {
        log::debug!("Publishing {:?} to {} subscribers", event, self.subscribers.len());
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
