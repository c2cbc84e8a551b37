//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! default every field, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the feeder service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FeederConfig {
    /// Listener and run parameters.
    pub server: ServerConfig,

    /// Persistence backend selection.
    pub storage: StorageConfig,

    /// Where the per-run log file goes.
    pub sink: SinkConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Immutable run parameters for one server run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen protocol. Only `tcp` is supported.
    pub protocol: String,

    /// Listen host. Empty means every interface.
    pub host: String,

    /// Listen port. `0` picks an ephemeral port.
    pub port: u16,

    /// How long the run lasts before a timeout shutdown, in milliseconds.
    pub run_timeout_ms: u64,

    /// Maximum concurrently in-flight connections (admission slots).
    pub max_connections: usize,

    /// Longest accepted request line, line ending included.
    pub max_line_bytes: usize,

    /// How long shutdown waits for in-flight connections, in milliseconds.
    pub drain_grace_ms: u64,
}

impl ServerConfig {
    /// Host and port in a form accepted by `TcpListener::bind`.
    pub fn bind_target(&self) -> (&str, u16) {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        };
        (host, self.port)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            host: String::new(),
            port: 3333,
            run_timeout_ms: 60_000,
            max_connections: 5,
            max_line_bytes: 1024,
            drain_grace_ms: 500,
        }
    }
}

/// Which persistence backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process only; nothing survives the run.
    Memory,
    /// JSON file on disk.
    File,
}

/// Persistence backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Store location for the `file` backend.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "feeder_skus.json".to_string(),
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Directory receiving `feeder_<timestamp>.log`.
    pub directory: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
