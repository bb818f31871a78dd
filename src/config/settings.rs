use std::time::Duration;

use serde::Deserialize;

use crate::broker::DeliveryPolicy;
use crate::client::DEFAULT_PING_INTERVAL;

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub log: LogSettings,
}

/// Address the listener binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Routing and liveness behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    /// Heartbeat period T. A silent peer is evicted within 2×T.
    pub ping_interval_ms: u64,
    pub self_delivery: DeliveryPolicy,
}

impl RelaySettings {
    pub fn ping_interval(&self) -> Duration {
        // tokio intervals reject a zero period
        Duration::from_millis(self.ping_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Settings as read from files and the environment; anything missing is
/// filled in from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub ping_interval_ms: Option<u64>,
    pub self_delivery: Option<DeliveryPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 4444,
            },
            relay: RelaySettings {
                ping_interval_ms: u64::try_from(DEFAULT_PING_INTERVAL.as_millis()).unwrap_or(u64::MAX),
                self_delivery: DeliveryPolicy::default(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server;
        let relay = self.relay;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(defaults.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(defaults.server.port),
            },
            relay: RelaySettings {
                ping_interval_ms: relay
                    .as_ref()
                    .and_then(|r| r.ping_interval_ms)
                    .unwrap_or(defaults.relay.ping_interval_ms),
                self_delivery: relay
                    .as_ref()
                    .and_then(|r| r.self_delivery)
                    .unwrap_or(defaults.relay.self_delivery),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.log.level),
            },
        }
    }
}
