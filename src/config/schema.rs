//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the sidecar.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Durable log file settings.
    pub log_sink: LogSinkConfig,

    /// `/logs` stream settings.
    pub stream: StreamConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Port serving every route.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Rotating log file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Directory holding the active file and its backups.
    pub directory: PathBuf,

    /// Name of the active file inside `directory`.
    pub file_name: String,

    /// Rotate once a write would push the file past this size.
    pub max_bytes: u64,

    /// Number of rotated files kept (`app.log.1` .. `app.log.N`).
    pub backup_count: usize,
}

impl LogSinkConfig {
    /// Full path of the active log file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "app.log".to_string(),
            max_bytes: 2_000_000,
            backup_count: 5,
        }
    }
}

/// Log stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Delay between generated lines in milliseconds.
    pub interval_ms: u64,

    /// Lines buffered between the generator and the response body.
    pub buffer: usize,
}

impl StreamConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            buffer: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SidecarConfig = toml::from_str(
            r#"
            [listener]
            port = 9100

            [log_sink]
            directory = "/var/log/sidecar"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9100);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.log_sink.path(), PathBuf::from("/var/log/sidecar/app.log"));
        assert_eq!(config.log_sink.backup_count, 5);
        assert_eq!(config.stream.interval(), Duration::from_secs(1));
    }
}
