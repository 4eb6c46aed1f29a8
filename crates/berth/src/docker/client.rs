//! Docker client: core struct, constructor, error types.
//!
//! Domain methods live in sibling modules (`container`, `swarm`) which add
//! `impl DockerClient` blocks.

use bollard::Docker;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    #[error("This node is not a swarm manager. Swarm management operations require a manager node.")]
    NotSwarmManager,
    #[error("Unexpected daemon response: {0}")]
    UnexpectedResponse(String),
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

impl DockerError {
    /// HTTP-style status code carried by the failure, if the daemon gave one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DockerError::ContainerNotFound(_) | DockerError::ServiceNotFound(_) => Some(404),
            DockerError::NotSwarmManager | DockerError::ConnectionFailed(_) => Some(503),
            DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
                status_code,
                ..
            }) => Some(*status_code),
            DockerError::UnexpectedResponse(_) | DockerError::BollardError(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// `pub(super)` so that domain modules in sibling files can call
    /// bollard APIs directly.
    pub(super) client: Docker,
}

impl DockerClient {
    /// Connect to the daemon. An empty `socket_path` uses bollard's defaults
    /// (`DOCKER_HOST` or the platform socket).
    pub fn new(socket_path: &str) -> Result<Self, DockerError> {
        let connection = if socket_path.is_empty() {
            Docker::connect_with_defaults()
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        } else {
            let clean_path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        };

        Ok(DockerClient { client: connection })
    }
}

/// Map a bollard 404 on a container call to [`DockerError::ContainerNotFound`].
pub(super) fn container_error(container_id: &str, e: bollard::errors::Error) -> DockerError {
    match e {
        bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
            DockerError::ContainerNotFound(container_id.to_string())
        }
        other => DockerError::BollardError(other),
    }
}

/// Map bollard errors on swarm calls: 404 is a missing service, 503 means
/// this node cannot manage the swarm.
pub(super) fn service_error(service_id: &str, e: bollard::errors::Error) -> DockerError {
    match e {
        bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
            DockerError::ServiceNotFound(service_id.to_string())
        }
        bollard::errors::Error::DockerResponseServerError { status_code: 503, .. } => {
            DockerError::NotSwarmManager
        }
        other => DockerError::BollardError(other),
    }
}
