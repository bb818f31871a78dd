//! # signal-relay
//!
//! `signal-relay` is an in-memory, topic-based publish/subscribe relay for
//! real-time peers. It carries WebRTC signaling and collaborative-editing
//! awareness frames between clients over WebSockets without looking inside
//! them, storing them, or retrying them.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry and the router that applies subscribe,
//!   unsubscribe, publish and ping.
//! - `client`: the per-connection record and its heartbeat state machine.
//! - `config`: layered configuration (defaults, file, environment).
//! - `transport`: the WebSocket listener, wire protocol and connection handler.
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;

pub use broker::{Broker, DeliveryPolicy, SharedBroker};
pub use config::{Settings, load_config};
pub use transport::{serve, start_websocket_server};
pub use utils::RelayError;
