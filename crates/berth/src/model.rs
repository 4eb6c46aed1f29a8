//! Model: records shared by every backend.
//!
//! All of these are request/response values. Nothing here is cached or
//! persisted; the daemon owns the authoritative state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized lifecycle snapshot of one container (single-host) or one
/// service (clustered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// Backend-native identifier, opaque to callers.
    pub id: String,
    pub name: String,
    pub image: String,
    /// `running`, `stopped`, `pending`, `partial`, or a raw daemon state
    /// such as `exited` for single-host containers.
    pub status: String,
    /// Deduplicated and display-sorted, see [`crate::backend::base::sort_ports`].
    pub ports: Vec<String>,
    /// ISO-8601 UTC, millisecond precision.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// Output stream a log line was written to (best-effort for unframed lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
        }
    }

    /// `Stderr` when `is_stderr` holds, `Stdout` otherwise.
    pub fn pick(is_stderr: bool) -> Self {
        if is_stderr {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        }
    }
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// `YYYY-MM-DD HH:MM:SS.fffffffff`, no zone marker. Fixed width for daemon
    /// timestamps, so lexicographic order is chronological order.
    pub timestamp: String,
    pub message: String,
    pub stream: LogStream,
}

/// Host-port to container-port publication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub host_port: u16,
    pub container_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl PortBinding {
    pub fn tcp(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
            protocol: default_protocol(),
        }
    }
}

/// Host directory bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBinding {
    pub host_path: String,
    pub container_path: String,
    /// `rw` or `ro`.
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl VolumeBinding {
    pub fn is_read_only(&self) -> bool {
        self.mode == "ro"
    }
}

/// Declarative deployment request.
///
/// Field-level validation (name charset, replica range, label/env key
/// shape) is the caller's job and is assumed to have happened already.
/// Host-port uniqueness is checked by every backend before any daemon call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    pub image: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default)]
    pub ports: Option<Vec<PortBinding>>,
    #[serde(default)]
    pub volumes: Option<Vec<VolumeBinding>>,
    /// Only the clustered backend uses this.
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default = "default_restart_policy")]
    pub restart_policy: bool,
}

impl DeployConfig {
    /// A request for `image` with every optional field at its default.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            env: None,
            ports: None,
            volumes: None,
            replicas: default_replicas(),
            network: None,
            labels: None,
            restart_policy: default_restart_policy(),
        }
    }

    /// `KEY=VALUE` pairs, sorted by key so the daemon sees a stable order.
    pub fn env_pairs(&self) -> Vec<String> {
        let Some(env) = &self.env else { return Vec::new() };
        let mut pairs: Vec<String> = env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        pairs
    }
}

/// In-memory filter applied to `list` results. Every present field must
/// match; absent fields impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    /// Substring of the id.
    pub id: Option<String>,
    /// Substring of the name.
    pub name: Option<String>,
    /// Substring of the image reference.
    pub image: Option<String>,
    /// Exact status.
    pub status: Option<String>,
    /// Every listed port string must be present.
    pub ports: Option<Vec<String>>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
    pub labels: Option<Vec<HashMap<String, String>>>,
    pub env: Option<Vec<HashMap<String, String>>>,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

fn default_mode() -> String {
    "rw".to_string()
}

fn default_replicas() -> u32 {
    1
}

fn default_restart_policy() -> bool {
    true
}
