//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the vote receiver.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Socket settings and timeouts.
    pub listener: ListenerConfig,

    /// Greeting sent to clients.
    pub protocol: ProtocolConfig,

    /// Where the RSA key pair lives.
    pub keys: KeysConfig,

    /// Logging verbosity and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// How long one `accept()` waits before the loop re-checks for shutdown.
    pub accept_timeout_ms: u64,

    /// Time a client gets to send its whole block.
    pub read_timeout_ms: u64,

    /// Cap on concurrently running connection handlers. Unbounded when unset.
    pub max_connections: Option<usize>,
}

impl ListenerConfig {
    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8192,
            accept_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            max_connections: None,
        }
    }
}

/// Protocol settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Version announced in the `VOTIFIER <version>` greeting.
    pub version: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: "1.9".to_string(),
        }
    }
}

/// Key storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Directory holding `private.key` and `public.key`.
    pub directory: PathBuf,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("rsa"),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Verbose logging of connections and vote contents.
    pub debug: bool,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            debug: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9192".to_string(),
        }
    }
}
