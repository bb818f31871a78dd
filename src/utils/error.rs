//! Error types shared across the relay.
//!
//! Only startup failures (configuration, binding the listener) ever reach
//! the binary. Per-connection failures are absorbed where they happen: a
//! failed send closes that one connection and routing carries on.

use thiserror::Error;

use crate::client::ConnectionId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection is no longer in a state that accepts frames.
    #[error("connection {0} is not writable")]
    NotWritable(ConnectionId),

    /// The writer task for the connection has gone away.
    #[error("outbound channel for {0} is closed")]
    ChannelClosed(ConnectionId),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}
