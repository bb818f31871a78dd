//! Broker engine
//!
//! This module contains the in-memory router responsible for:
//! - keeping the topic registry and every connection's own topic set in step
//! - fanning published frames out to subscribers, stamped with `clients`
//! - answering application-level pings
//! - closing a connection and releasing all of its subscriptions
//!
//! Concurrency and usage notes:
//! - The public API is synchronous and is meant to be held behind a lock
//!   (`SharedBroker`) by the transport layer. Sends only push onto the
//!   receiver's unbounded channel, so no operation waits on the network and
//!   the lock is never held across an `.await`.
//! - Delivery is best-effort. A receiver whose send fails is closed on the
//!   spot and the fan-out continues with the rest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use axum::extract::ws::{Message as WsMessage, Utf8Bytes};

use crate::broker::registry::TopicRegistry;
use crate::client::{Client, ConnectionId};
use crate::transport::message::{ClientMessage, PublishFrame, ServerMessage};
use crate::utils::RelayError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock the shared broker. A panic while the lock was held cannot leave the
/// registry half-updated, so a poisoned lock is simply taken over.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a publisher receives its own publish frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Forward to every subscriber except the publisher.
    #[default]
    ExcludePublisher,
    /// Forward to every subscriber, the publisher included.
    IncludePublisher,
}

impl DeliveryPolicy {
    fn admits(self, publisher: ConnectionId, receiver: ConnectionId) -> bool {
        match self {
            Self::ExcludePublisher => publisher != receiver,
            Self::IncludePublisher => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Broker {
    registry: TopicRegistry,
    clients: HashMap<ConnectionId, Client>,
    policy: DeliveryPolicy,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DeliveryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedBroker {
        Arc::new(Mutex::new(self))
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn client(&self, id: &ConnectionId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Track a newly accepted connection. Must happen before any of its
    /// frames are routed.
    pub fn register_client(&mut self, client: Client) -> ConnectionId {
        let id = client.id;
        self.clients.insert(id, client);
        id
    }

    /// A connection is routable while it is registered and writable.
    pub fn is_open(&self, id: &ConnectionId) -> bool {
        self.clients
            .get(id)
            .is_some_and(|c| c.state().is_writable())
    }

    /// Apply one decoded message on behalf of `id`. Messages from a
    /// connection that is already closed are ignored.
    pub fn handle(&mut self, id: ConnectionId, msg: ClientMessage) {
        if !self.is_open(&id) {
            debug!("Ignoring message from closed connection {id}");
            return;
        }

        match msg {
            ClientMessage::Subscribe { topics } => self.subscribe(id, &topics),
            ClientMessage::Unsubscribe { topics } => self.unsubscribe(id, &topics),
            ClientMessage::Publish(frame) => {
                self.publish(id, frame);
            }
            ClientMessage::Ping {} => {
                self.ping(id);
            }
        }
    }

    /// Subscribe `id` to each named topic. Repeats are a no-op.
    pub fn subscribe(&mut self, id: ConnectionId, topics: &[String]) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };

        for topic in topics {
            client.add_topic(topic);
            if self.registry.subscribe(topic, id) {
                debug!("{id} subscribed to {topic}");
            }
        }
    }

    /// Unsubscribe `id` from each named topic, on both the registry side
    /// and the connection's own set. Unknown topics are ignored.
    pub fn unsubscribe(&mut self, id: ConnectionId, topics: &[String]) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };

        for topic in topics {
            client.remove_topic(topic);
            if self.registry.unsubscribe(topic, &id) {
                debug!("{id} unsubscribed from {topic}");
            }
        }
    }

    /// Forward `frame` to the eligible subscribers of its topic and return
    /// how many sends were attempted. That count is also the `clients`
    /// value stamped on the forwarded frame.
    pub fn publish(&mut self, publisher: ConnectionId, frame: PublishFrame) -> usize {
        if frame.topic.is_empty() {
            return 0;
        }

        let Some(topic) = self.registry.get(&frame.topic) else {
            debug!("Publish to '{}' from {publisher} has no subscribers", frame.topic);
            return 0;
        };

        let receivers: Vec<ConnectionId> = topic
            .subscribers()
            .copied()
            .filter(|receiver| self.policy.admits(publisher, *receiver))
            .collect();
        if receivers.is_empty() {
            return 0;
        }

        let topic_name = frame.topic.clone();
        let text: Utf8Bytes = match serde_json::to_string(&frame.into_outgoing(receivers.len())) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("Failed to serialize publish frame for '{topic_name}': {e}");
                return 0;
            }
        };

        for receiver in &receivers {
            self.deliver(*receiver, WsMessage::Text(text.clone()));
        }

        debug!(
            "{publisher} published to {topic_name} ({} receivers)",
            receivers.len()
        );
        receivers.len()
    }

    /// Reply to an application-level ping. Leaves the registry untouched.
    /// Returns `false` if the pong could not be queued and the connection
    /// was closed.
    pub fn ping(&mut self, id: ConnectionId) -> bool {
        let result = match self.clients.get(&id) {
            Some(client) => client.send_json(&ServerMessage::Pong {}),
            None => return false,
        };
        self.settle(id, result)
    }

    /// Queue `msg` for `id`. If the connection cannot take it, it is closed
    /// and `false` is returned; other connections are unaffected.
    pub fn deliver(&mut self, id: ConnectionId, msg: WsMessage) -> bool {
        let result = match self.clients.get(&id) {
            Some(client) => client.send(msg),
            None => return false,
        };
        self.settle(id, result)
    }

    fn settle(&mut self, id: ConnectionId, result: Result<(), RelayError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Send to {id} failed, closing: {e}");
                self.close_client(&id);
                false
            }
        }
    }

    /// Close a connection and drop it from every topic it subscribed to,
    /// pruning topics left empty. Safe to call repeatedly; only the first
    /// call has any effect.
    pub fn close_client(&mut self, id: &ConnectionId) -> bool {
        let Some(mut client) = self.clients.remove(id) else {
            return false;
        };

        client.close();
        for topic in client.take_topics() {
            self.registry.unsubscribe(&topic, id);
        }

        info!(
            "Closed {id} after {}s",
            client.lifetime().num_seconds()
        );
        true
    }
}
