use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listening endpoint, the relay itself and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the relay will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the relay.
///
/// Bounds how many connections are served at once and how long a single
/// connection may stall the handshake or a fan-out write.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub max_connections: usize,
    /// `0` disables the handshake timeout.
    pub handshake_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub max_line_bytes: usize,
}

impl RelaySettings {
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_ms > 0).then(|| Duration::from_millis(self.handshake_timeout_ms))
    }

    /// `max_connections`, capped at what a `tokio::sync::Semaphore` can hold.
    pub fn connection_limit(&self) -> usize {
        self.max_connections.min(Semaphore::MAX_PERMITS)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
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
    pub max_connections: Option<usize>,
    pub handshake_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub max_line_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// The port matches the one existing sender and receiver deployments dial.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 12345,
            },
            relay: RelaySettings {
                max_connections: 1024,
                handshake_timeout_ms: 10_000,
                write_timeout_ms: 5_000,
                max_line_bytes: 64 * 1024,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
