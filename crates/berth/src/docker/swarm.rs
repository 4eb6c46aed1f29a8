//! Swarm domain: services and tasks.

use std::collections::HashMap;

use super::client::{service_error, DockerClient, DockerError};

use bollard::models::{Service, ServiceSpec, Task};
use bollard::query_parameters::{ListServicesOptions, ListTasksOptions, UpdateServiceOptions};

impl DockerClient {
    /// List all swarm services.
    pub async fn list_services(&self) -> Result<Vec<Service>, DockerError> {
        match self.client.list_services(None::<ListServicesOptions>).await {
            Ok(services) => Ok(services),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 503, .. }) => {
                Err(DockerError::NotSwarmManager)
            }
            Err(e) => Err(DockerError::from(e)),
        }
    }

    /// Inspect a specific swarm service.
    pub async fn inspect_service(&self, service_id: &str) -> Result<Service, DockerError> {
        self.client
            .inspect_service(service_id, None)
            .await
            .map_err(|e| service_error(service_id, e))
    }

    /// List tasks in the swarm. With `service_id` the daemon filters to that
    /// service's tasks.
    pub async fn list_tasks(&self, service_id: Option<&str>) -> Result<Vec<Task>, DockerError> {
        let options = service_id.map(|id| ListTasksOptions {
            filters: Some(HashMap::from([("service".to_string(), vec![id.to_string()])])),
        });
        match self.client.list_tasks(options).await {
            Ok(tasks) => Ok(tasks),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 503, .. }) => {
                Err(DockerError::NotSwarmManager)
            }
            Err(e) => Err(DockerError::from(e)),
        }
    }

    /// Create a new swarm service. Returns the service ID.
    pub async fn create_service(&self, spec: ServiceSpec) -> Result<String, DockerError> {
        let result = self.client.create_service(spec, None).await.map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError { status_code: 503, .. } => {
                DockerError::NotSwarmManager
            }
            other => DockerError::from(other),
        })?;
        result.id.filter(|id| !id.is_empty()).ok_or_else(|| {
            DockerError::UnexpectedResponse(
                "Docker returned success but did not provide a service ID".to_string(),
            )
        })
    }

    /// Replace a service spec at the given version index.
    pub async fn update_service(
        &self,
        service_id: &str,
        spec: ServiceSpec,
        version: u64,
    ) -> Result<(), DockerError> {
        let version = i32::try_from(version).map_err(|_| {
            DockerError::UnexpectedResponse(format!(
                "Service version index {} exceeds i32::MAX; cannot update via bollard",
                version
            ))
        })?;
        let options = UpdateServiceOptions {
            version,
            ..Default::default()
        };

        self.client
            .update_service(service_id, spec, options, None)
            .await
            .map(|_| ())
            .map_err(|e| service_error(service_id, e))
    }

    /// Delete a swarm service.
    pub async fn delete_service(&self, service_id: &str) -> Result<(), DockerError> {
        self.client
            .delete_service(service_id)
            .await
            .map_err(|e| service_error(service_id, e))
    }
}
