//! Containers service: the lifecycle façade callers talk to.
//!
//! Writes (`start`, `stop`, `deploy`, `remove`) surface backend failures.
//! Reads (`list`, `logs`) degrade to an empty result instead, so a partly
//! broken daemon still answers queries; callers cannot tell "empty" from
//! "failed" at this layer.

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, ContainerBackend};
use crate::docker::logs::LogQuery;
use crate::error::ContainerError;
use crate::filter::FilterEngine;
use crate::model::{ContainerInfo, DeployConfig, ListFilter, LogEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub containers: Vec<ContainerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

pub struct ContainerService<B = Backend> {
    backend: B,
}

impl<B: ContainerBackend> ContainerService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn start(&self, id: &str) -> Result<StatusResponse, ContainerError> {
        self.backend.start(id).await.inspect_err(|e| log_failure("start", id, e))?;
        Ok(StatusResponse {
            status: "started".to_string(),
        })
    }

    pub async fn stop(&self, id: &str, timeout_secs: Option<u64>) -> Result<StatusResponse, ContainerError> {
        self.backend
            .stop(id, timeout_secs)
            .await
            .inspect_err(|e| log_failure("stop", id, e))?;
        Ok(StatusResponse {
            status: "stopped".to_string(),
        })
    }

    pub async fn deploy(&self, config: &DeployConfig) -> Result<DeployResponse, ContainerError> {
        let id = self
            .backend
            .deploy(config)
            .await
            .inspect_err(|e| log_failure("deploy", config.name.as_deref().unwrap_or(&config.image), e))?;
        Ok(DeployResponse { id })
    }

    pub async fn list(&self, filter: Option<&ListFilter>) -> ListResponse {
        let containers = match self.backend.list().await {
            Ok(containers) => containers,
            Err(e) => {
                tracing::error!(error = %e, status_code = e.status_code(), "Listing failed, returning no containers");
                Vec::new()
            }
        };

        let containers = match filter {
            Some(filter) => {
                let engine = FilterEngine::new(filter);
                let kept = engine.apply(containers);
                let (scanned, matched) = engine.stats();
                tracing::debug!(scanned, matched, "Applied list filter");
                kept
            }
            None => containers,
        };
        ListResponse { containers }
    }

    /// Linear scan of the unfiltered list.
    pub async fn get_by_id(&self, id: &str) -> Option<ContainerInfo> {
        self.list(None)
            .await
            .containers
            .into_iter()
            .find(|c| c.id == id)
    }

    pub async fn logs(&self, id: &str, since: Option<String>, tail: Option<u64>) -> LogsResponse {
        let query = LogQuery::new(since, tail);
        let logs = match self.backend.logs(id, &query).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::error!(id = %id, error = %e, status_code = e.status_code(), "Log fetch failed, returning no entries");
                Vec::new()
            }
        };
        LogsResponse { logs }
    }

    pub async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        self.backend.remove(id).await.inspect_err(|e| log_failure("remove", id, e))
    }
}

fn log_failure(operation: &str, resource: &str, e: &ContainerError) {
    tracing::error!(
        operation,
        resource = %resource,
        status_code = e.status_code(),
        context = e.context().unwrap_or_default(),
        error = %e,
        "Container operation failed"
    );
}
