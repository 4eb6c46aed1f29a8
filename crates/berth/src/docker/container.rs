//! Container domain: list, create, lifecycle, and log retrieval.

use super::client::{container_error, DockerClient, DockerError};
use super::logs::{render_frame, LogQuery};

use bollard::models::{ContainerCreateBody, ContainerSummary};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use futures_util::stream::StreamExt;

impl DockerClient {
    /// All containers, stopped ones included.
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>, DockerError> {
        let options = Some(ListContainersOptions {
            all: true,
            ..Default::default()
        });
        Ok(self.client.list_containers(options).await?)
    }

    /// Create (but do not start) a container. Returns the daemon-assigned id.
    pub async fn create_container(
        &self,
        name: &str,
        body: ContainerCreateBody,
    ) -> Result<String, DockerError> {
        let options = CreateContainerOptionsBuilder::default().name(name).build();
        let response = self.client.create_container(Some(options), body).await?;
        if response.id.is_empty() {
            return Err(DockerError::UnexpectedResponse(
                "Docker returned success but did not provide a container ID".to_string(),
            ));
        }
        for warning in &response.warnings {
            tracing::warn!(container = %name, "Daemon warning on create: {}", warning);
        }
        Ok(response.id)
    }

    /// Start a stopped container.
    pub async fn start_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .start_container(container_id, None)
            .await
            .map_err(|e| container_error(container_id, e))
    }

    /// Stop a running container, waiting `timeout_secs` before the daemon kills it.
    pub async fn stop_container(
        &self,
        container_id: &str,
        timeout_secs: Option<i32>,
    ) -> Result<(), DockerError> {
        let options = timeout_secs.map(|t| StopContainerOptions {
            t: Some(t),
            ..Default::default()
        });

        self.client
            .stop_container(container_id, options)
            .await
            .map_err(|e| container_error(container_id, e))
    }

    /// Remove a container. If `force` is true, the container will be killed first.
    pub async fn remove_container(
        &self,
        container_id: &str,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), DockerError> {
        let options = Some(RemoveContainerOptions {
            force,
            v: remove_volumes,
            ..Default::default()
        });

        self.client
            .remove_container(container_id, options)
            .await
            .map_err(|e| container_error(container_id, e))
    }

    /// Fetch combined stdout/stderr with timestamps as tagged raw text,
    /// one line per log record.
    pub async fn container_logs(
        &self,
        container_id: &str,
        query: &LogQuery,
    ) -> Result<String, DockerError> {
        let options = LogsOptions {
            follow: false,
            stdout: true,
            stderr: true,
            since: query.since_param(chrono::Utc::now()),
            until: 0,
            timestamps: true,
            tail: query.tail_param(),
        };

        let mut frames = self.client.logs(container_id, Some(options));
        let mut raw = String::new();
        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|e| container_error(container_id, e))?;
            render_frame(&mut raw, frame);
        }
        Ok(raw)
    }
}
