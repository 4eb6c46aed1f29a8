//! Single-host backend: one deploy request becomes one container.

use std::collections::HashMap;
use std::sync::Arc;

use bollard::models::{
    ContainerCreateBody, ContainerSummary, HostConfig, PortBinding as DaemonPortBinding,
    RestartPolicy, RestartPolicyNameEnum,
};

use super::base;
use super::ContainerBackend;
use crate::client::docker::DockerOps;
use crate::docker::logs::LogQuery;
use crate::error::{BackendError, ContainerError};
use crate::logs::LogParser;
use crate::model::{ContainerInfo, DeployConfig, LogEntry};

const NAME_PREFIX: &str = "container";

pub struct DockerBackend {
    docker: Arc<dyn DockerOps>,
    parser: Arc<LogParser>,
    default_stop_timeout_secs: u64,
}

impl DockerBackend {
    pub fn new(docker: Arc<dyn DockerOps>, parser: Arc<LogParser>, default_stop_timeout_secs: u64) -> Self {
        Self {
            docker,
            parser,
            default_stop_timeout_secs,
        }
    }
}

impl ContainerBackend for DockerBackend {
    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .start_container(id)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to start container {}", id), e))?;
        tracing::info!(container_id = %id, "Container started");
        Ok(())
    }

    async fn stop(&self, id: &str, timeout_secs: Option<u64>) -> Result<(), ContainerError> {
        let timeout = timeout_secs.unwrap_or(self.default_stop_timeout_secs);
        self.docker
            .stop_container(id, Some(base::stop_timeout(timeout)))
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to stop container {}", id), e))?;
        tracing::info!(container_id = %id, timeout, "Container stopped");
        Ok(())
    }

    async fn deploy(&self, config: &DeployConfig) -> Result<String, ContainerError> {
        base::validate_config(config)?;

        let name = config
            .name
            .clone()
            .unwrap_or_else(|| base::generate_name(NAME_PREFIX));
        let body = create_body(config);

        let id = self
            .docker
            .create_container(&name, body)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to create container {}", name), e))?;
        self.docker
            .start_container(&id)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to start container {}", id), e))?;

        tracing::info!(container_id = %id, name = %name, image = %config.image, "Container deployed");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<ContainerInfo>, ContainerError> {
        let containers = self
            .docker
            .list_containers()
            .await
            .map_err(|e| BackendError::from_docker("Failed to list containers", e))?;
        Ok(containers.into_iter().map(container_info).collect())
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        if let Err(e) = self
            .docker
            .stop_container(id, Some(base::stop_timeout(self.default_stop_timeout_secs)))
            .await
        {
            tracing::debug!(container_id = %id, error = %e, "Stop before remove failed, continuing");
        }

        self.docker
            .remove_container(id, false, false)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to remove container {}", id), e))?;
        tracing::info!(container_id = %id, "Container removed");
        Ok(())
    }

    async fn logs(&self, id: &str, query: &LogQuery) -> Result<Vec<LogEntry>, ContainerError> {
        let raw = self
            .docker
            .container_logs(id, query)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to get logs for {}", id), e))?;
        Ok(self.parser.parse(&raw))
    }
}

/// Translate a deploy request into a create body.
fn create_body(config: &DeployConfig) -> ContainerCreateBody {
    let env = config.env_pairs();

    let port_bindings: HashMap<String, Option<Vec<DaemonPortBinding>>> = config
        .ports
        .iter()
        .flatten()
        .map(|p| {
            (
                format!("{}/{}", p.container_port, p.protocol),
                Some(vec![DaemonPortBinding {
                    host_ip: None,
                    host_port: Some(p.host_port.to_string()),
                }]),
            )
        })
        .collect();

    let binds: Vec<String> = config
        .volumes
        .iter()
        .flatten()
        .map(|v| format!("{}:{}:{}", v.host_path, v.container_path, v.mode))
        .collect();

    let restart = if config.restart_policy {
        RestartPolicyNameEnum::ALWAYS
    } else {
        RestartPolicyNameEnum::NO
    };

    ContainerCreateBody {
        image: Some(config.image.clone()),
        env: if env.is_empty() { None } else { Some(env) },
        labels: config.labels.clone(),
        host_config: Some(HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            binds: if binds.is_empty() { None } else { Some(binds) },
            restart_policy: Some(RestartPolicy {
                name: Some(restart),
                ..Default::default()
            }),
            network_mode: config.network.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Normalize a daemon container summary.
fn container_info(s: ContainerSummary) -> ContainerInfo {
    let ports = s.ports.unwrap_or_default().into_iter().map(|p| {
        match (p.public_port, p.private_port) {
            (Some(public), 0) => public.to_string(),
            (Some(public), private) => format!("{}:{}", public, private),
            (None, private) => private.to_string(),
        }
    });

    ContainerInfo {
        id: s.id.unwrap_or_default(),
        name: s
            .names
            .as_deref()
            .and_then(|n| n.first())
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or_default()
            .to_string(),
        image: s.image.unwrap_or_default(),
        status: s
            .state
            .map(|state| state.to_string())
            .unwrap_or_else(|| "unknown".into()),
        ports: base::sort_ports(ports),
        created_at: base::iso_from_unix(s.created.unwrap_or_default()),
        labels: s.labels,
        env: None,
    }
}
