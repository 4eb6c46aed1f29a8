//! Error taxonomy for backend operations.
//!
//! Callers see two kinds of failure: a [`ValidationError`] when a request is
//! rejected before any daemon call, and a [`BackendError`] wrapping whatever
//! the daemon reported. Startup failures use [`ConfigError`].

use thiserror::Error;

use crate::docker::client::DockerError;
use crate::logs::parser::LineError;

/// Request rejected before the daemon was contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A daemon failure, carrying the operation that hit it and an HTTP-style
/// status code (500 when the daemon gave none).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub context: Option<String>,
    pub status_code: u16,
}

impl BackendError {
    pub fn new(message: impl Into<String>, context: Option<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            context,
            status_code,
        }
    }

    /// Wrap a daemon error. The original is logged with its context before
    /// it is flattened into a message.
    pub fn from_docker(context: impl Into<String>, err: DockerError) -> Self {
        let context = context.into();
        tracing::error!(context = %context, error = %err, "Daemon call failed");
        Self {
            message: err.to_string(),
            status_code: err.status_code().unwrap_or(500),
            context: Some(context),
        }
    }
}

/// Anything a backend operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ContainerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ContainerError::Validation(_) => 400,
            ContainerError::Backend(e) => e.status_code,
        }
    }

    /// Operation context, when the failure came from the daemon.
    pub fn context(&self) -> Option<&str> {
        match self {
            ContainerError::Validation(_) => None,
            ContainerError::Backend(e) => e.context.as_deref(),
        }
    }
}

/// Per-task failure while collecting logs across a clustered service.
/// Never fails the overall operation; the collector logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task_id} (container {container_id}): {error}")]
pub struct PartialFailure {
    pub task_id: String,
    pub container_id: String,
    pub error: String,
}

/// Startup failures. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown container backend: {0}")]
    UnknownBackend(String),
    #[error("Container backend '{0}' is not implemented")]
    UnimplementedBackend(String),
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Failed to reach the container daemon: {0}")]
    Connection(#[from] DockerError),
    #[error("Failed to build log parser: {0}")]
    LogParser(#[from] LineError),
}
