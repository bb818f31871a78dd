//! The `client` module defines the relay's view of one connected peer.
//!
//! `Client` is the per-connection record the broker keeps: its handle, the
//! channel used to push frames to it, its transport state and the set of
//! topics it is subscribed to. `Heartbeat` is the liveness state machine
//! the connection handler drives from its ping timer.

pub mod connection;
pub mod heartbeat;

pub use connection::{Client, ConnectionId, ConnectionState};
pub use heartbeat::{DEFAULT_PING_INTERVAL, Heartbeat, HeartbeatAction};
