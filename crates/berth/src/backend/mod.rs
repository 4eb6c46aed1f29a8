//! Backend contract and selection.
//!
//! A backend maps the lifecycle operations onto one container-execution
//! system. The active backend is picked once at startup from configuration
//! and never changes for the life of the process.

pub mod base;
pub mod docker;
pub mod swarm;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::docker::DockerOps;
use crate::conf::model::BerthConfig;
use crate::docker::logs::LogQuery;
use crate::error::{ConfigError, ContainerError};
use crate::logs::LogParser;
use crate::model::{ContainerInfo, DeployConfig, LogEntry};

pub use self::docker::DockerBackend;
pub use self::swarm::SwarmBackend;

/// Lifecycle operations every backend provides.
pub trait ContainerBackend: Send + Sync {
    fn start(&self, id: &str) -> impl Future<Output = Result<(), ContainerError>> + Send;

    /// `timeout_secs` bounds how long the backend waits for the workload to
    /// wind down; `None` uses the configured default.
    fn stop(
        &self,
        id: &str,
        timeout_secs: Option<u64>,
    ) -> impl Future<Output = Result<(), ContainerError>> + Send;

    /// Validates host-port uniqueness before any daemon call, then creates
    /// the workload and returns its id.
    fn deploy(
        &self,
        config: &DeployConfig,
    ) -> impl Future<Output = Result<String, ContainerError>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<ContainerInfo>, ContainerError>> + Send;

    fn remove(&self, id: &str) -> impl Future<Output = Result<(), ContainerError>> + Send;

    fn logs(
        &self,
        id: &str,
        query: &LogQuery,
    ) -> impl Future<Output = Result<Vec<LogEntry>, ContainerError>> + Send;
}

/// Backend names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Docker,
    Swarm,
    /// Declared but not implemented; selecting it fails at startup.
    Kubernetes,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Docker => "docker",
            BackendKind::Swarm => "swarm",
            BackendKind::Kubernetes => "kubernetes",
        }
    }

    /// Parse and reject kinds that have no implementation.
    pub fn resolve(raw: &str) -> Result<Self, ConfigError> {
        match raw.parse()? {
            BackendKind::Kubernetes => Err(ConfigError::UnimplementedBackend(
                BackendKind::Kubernetes.as_str().to_string(),
            )),
            kind => Ok(kind),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(BackendKind::Docker),
            "swarm" => Ok(BackendKind::Swarm),
            "kubernetes" => Ok(BackendKind::Kubernetes),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend chosen at startup.
pub enum Backend {
    Docker(DockerBackend),
    Swarm(SwarmBackend),
}

impl Backend {
    /// Build the configured backend over `docker`.
    pub fn from_config(config: &BerthConfig, docker: Arc<dyn DockerOps>) -> Result<Self, ConfigError> {
        let kind = BackendKind::resolve(&config.backend)?;
        let parser = Arc::new(LogParser::new()?);
        tracing::info!(backend = %kind, "Selected container backend");
        Ok(match kind {
            BackendKind::Docker => Backend::Docker(DockerBackend::new(
                docker,
                parser,
                config.default_stop_timeout_secs,
            )),
            BackendKind::Swarm => Backend::Swarm(SwarmBackend::new(
                docker,
                parser,
                config.default_stop_timeout_secs,
                config.drain_poll_interval(),
            )),
            BackendKind::Kubernetes => {
                return Err(ConfigError::UnimplementedBackend(kind.to_string()))
            }
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Docker(_) => BackendKind::Docker,
            Backend::Swarm(_) => BackendKind::Swarm,
        }
    }
}

impl ContainerBackend for Backend {
    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        match self {
            Backend::Docker(b) => b.start(id).await,
            Backend::Swarm(b) => b.start(id).await,
        }
    }

    async fn stop(&self, id: &str, timeout_secs: Option<u64>) -> Result<(), ContainerError> {
        match self {
            Backend::Docker(b) => b.stop(id, timeout_secs).await,
            Backend::Swarm(b) => b.stop(id, timeout_secs).await,
        }
    }

    async fn deploy(&self, config: &DeployConfig) -> Result<String, ContainerError> {
        match self {
            Backend::Docker(b) => b.deploy(config).await,
            Backend::Swarm(b) => b.deploy(config).await,
        }
    }

    async fn list(&self) -> Result<Vec<ContainerInfo>, ContainerError> {
        match self {
            Backend::Docker(b) => b.list().await,
            Backend::Swarm(b) => b.list().await,
        }
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        match self {
            Backend::Docker(b) => b.remove(id).await,
            Backend::Swarm(b) => b.remove(id).await,
        }
    }

    async fn logs(&self, id: &str, query: &LogQuery) -> Result<Vec<LogEntry>, ContainerError> {
        match self {
            Backend::Docker(b) => b.logs(id, query).await,
            Backend::Swarm(b) => b.logs(id, query).await,
        }
    }
}
