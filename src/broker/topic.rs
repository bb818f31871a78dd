//! Topic management
//!
//! A `Topic` holds the set of connection handles subscribed to one topic
//! name. Duplicate subscriptions are a no-op. The topic does not own the
//! connections it lists; the broker resolves handles to live clients.

use std::collections::HashSet;

use crate::client::ConnectionId;

#[derive(Debug)]
pub struct Topic {
    pub name: String,
    subscribers: HashSet<ConnectionId>,
}

impl Topic {
    /// Create a new topic with the given name and no subscribers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn subscribe(&mut self, id: ConnectionId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, id: &ConnectionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.subscribers.contains(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Iteration order is unspecified.
    pub fn subscribers(&self) -> impl Iterator<Item = &ConnectionId> {
        self.subscribers.iter()
    }
}
