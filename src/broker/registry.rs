//! Topic registry
//!
//! Maps topic names to their subscriber sets. A topic exists exactly while
//! it has at least one subscriber: it is created on the first subscribe and
//! dropped by the unsubscribe that empties it.

use std::collections::HashMap;

use crate::broker::topic::Topic;
use crate::client::ConnectionId;

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to `topic`, creating the topic if needed.
    /// Returns `false` if `id` was already subscribed.
    pub fn subscribe(&mut self, topic: &str, id: ConnectionId) -> bool {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id)
    }

    /// Remove `id` from `topic`, dropping the topic once it is empty.
    /// Unknown topics are ignored. Returns whether `id` was removed.
    pub fn unsubscribe(&mut self, topic: &str, id: &ConnectionId) -> bool {
        let Some(entry) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = entry.unsubscribe(id);
        if entry.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    pub fn get(&self, topic: &str) -> Option<&Topic> {
        self.topics.get(topic)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }
}
