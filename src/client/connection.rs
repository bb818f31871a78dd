//! Client representation
//!
//! `Client` models a connected peer and holds the sending side of a
//! per-connection channel drained by the transport's writer task. The
//! broker owns every `Client` and resolves `ConnectionId` handles to them,
//! so routing never touches the socket itself.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;
use axum::extract::ws::Message as WsMessage;
use uuid::Uuid;

use crate::utils::RelayError;

/// Opaque handle issued to a connection when it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Transport readiness as seen by the router. A client is only registered
/// once its handshake has completed, and closing happens in one step under
/// the broker lock, so the router never sees anything in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

impl ConnectionState {
    /// Frames may only be queued while open.
    pub fn is_writable(self) -> bool {
        self == Self::Open
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    sender: UnboundedSender<WsMessage>,
    state: ConnectionState,
    topics: HashSet<String>,
    shutdown: Arc<Notify>,
    connected_at: DateTime<Utc>,
}

impl Client {
    /// Create a record for a freshly upgraded socket. The handshake has
    /// already completed, so the connection starts out `Open`.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
            state: ConnectionState::Open,
            topics: HashSet::new(),
            shutdown: Arc::new(Notify::new()),
            connected_at: Utc::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Topics this connection is currently subscribed to.
    pub fn topics(&self) -> &HashSet<String> {
        &self.topics
    }

    /// Notified once when the broker force-closes this connection. The
    /// connection handler waits on it to stop reading.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Time since the connection was accepted.
    pub fn lifetime(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    /// Queue a frame for the writer task.
    pub fn send(&self, msg: WsMessage) -> Result<(), RelayError> {
        if !self.state.is_writable() {
            return Err(RelayError::NotWritable(self.id));
        }
        self.sender
            .send(msg)
            .map_err(|_| RelayError::ChannelClosed(self.id))
    }

    /// Serialize `value` as a JSON text frame and queue it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), RelayError> {
        let text = serde_json::to_string(value)?;
        self.send(WsMessage::Text(text.into()))
    }

    pub(crate) fn add_topic(&mut self, topic: &str) -> bool {
        self.topics.insert(topic.to_string())
    }

    pub(crate) fn remove_topic(&mut self, topic: &str) -> bool {
        self.topics.remove(topic)
    }

    pub(crate) fn take_topics(&mut self) -> HashSet<String> {
        std::mem::take(&mut self.topics)
    }

    /// Tear the transport down: ask the writer to send a close frame, wake
    /// the connection handler, and refuse any further sends.
    pub(crate) fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        // The writer may already be gone; nothing left to tell it then.
        let _ = self.sender.send(WsMessage::Close(None));
        self.shutdown.notify_one();
        self.state = ConnectionState::Closed;
    }
}
