//! Ping/pong liveness tracking for a single connection.
//!
//! The connection handler owns one `Heartbeat` and advances it from a timer
//! with period T. A peer that misses a whole period without answering the
//! previous ping is reported as dead, so a silent connection is evicted
//! within 2×T. Application traffic does not count as a pong.

use std::time::Duration;

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Peer answered the last ping; send the next one.
    SendPing,
    /// No pong since the last ping; force-close the connection.
    Expire,
}

#[derive(Debug, Default)]
pub struct Heartbeat {
    awaiting_pong: bool,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance on a timer tick.
    pub fn tick(&mut self) -> HeartbeatAction {
        if self.awaiting_pong {
            HeartbeatAction::Expire
        } else {
            self.awaiting_pong = true;
            HeartbeatAction::SendPing
        }
    }

    /// Record a pong frame. Valid at any time, including before the first ping.
    pub fn pong(&mut self) {
        self.awaiting_pong = false;
    }

    pub fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }
}
