//! BerthConfig and related structs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    /// `docker` or `swarm`, case-insensitive.
    pub backend: String,
    /// Empty uses bollard's defaults (`DOCKER_HOST` or the platform socket).
    pub docker_socket: String,
    pub default_stop_timeout_secs: u64,
    pub drain_poll_interval_ms: u64,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            backend: "docker".to_string(),
            docker_socket: "".to_string(),
            default_stop_timeout_secs: 10,
            drain_poll_interval_ms: 500,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,berth=debug".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl BerthConfig {
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }
}
