//! The `transport` module is responsible for network communication with
//! peers over WebSockets.
//!
//! It defines the JSON wire protocol, serves the relay port over HTTP
//! (answering plain liveness requests on the same port), and runs one
//! connection handler per upgraded socket that feeds decoded frames to the
//! broker and keeps the heartbeat going.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, DecodeError, PublishFrame, ServerMessage};
pub use websocket::{create_router, handle_connection, serve, start_websocket_server};

#[cfg(test)]
mod tests;
