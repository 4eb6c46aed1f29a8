//! Clustered backend: one deploy request becomes one replicated swarm
//! service, and its status is aggregated from the service's tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bollard::models::{
    EndpointPortConfig, EndpointPortConfigProtocolEnum, EndpointPortConfigPublishModeEnum,
    EndpointSpec, Mount, MountTypeEnum, NetworkAttachmentConfig, Service, ServiceSpec,
    ServiceSpecMode, ServiceSpecModeReplicated, Task, TaskSpec, TaskSpecContainerSpec,
    TaskSpecRestartPolicy, TaskSpecRestartPolicyConditionEnum, TaskState,
};
use futures_util::future::join_all;
use tokio::time::Instant;

use super::base;
use super::ContainerBackend;
use crate::client::docker::DockerOps;
use crate::docker::logs::LogQuery;
use crate::error::{BackendError, ContainerError, PartialFailure};
use crate::logs::LogParser;
use crate::model::{ContainerInfo, DeployConfig, LogEntry, PortBinding};

const NAME_PREFIX: &str = "service";

pub struct SwarmBackend {
    docker: Arc<dyn DockerOps>,
    parser: Arc<LogParser>,
    default_stop_timeout_secs: u64,
    drain_poll_interval: Duration,
}

impl SwarmBackend {
    pub fn new(
        docker: Arc<dyn DockerOps>,
        parser: Arc<LogParser>,
        default_stop_timeout_secs: u64,
        drain_poll_interval: Duration,
    ) -> Self {
        Self {
            docker,
            parser,
            default_stop_timeout_secs,
            drain_poll_interval,
        }
    }

    /// Inspect a service and split it into its spec and version index.
    async fn current_spec(&self, id: &str, context: &str) -> Result<(ServiceSpec, u64), ContainerError> {
        let service = self
            .docker
            .inspect_service(id)
            .await
            .map_err(|e| BackendError::from_docker(context, e))?;

        let version = service
            .version
            .and_then(|v| v.index)
            .ok_or_else(|| BackendError::new("Service has no version index", Some(context.to_string()), 500))?;
        let spec = service
            .spec
            .ok_or_else(|| BackendError::new("Service has no spec", Some(context.to_string()), 500))?;
        Ok((spec, version))
    }

    async fn update(&self, id: &str, spec: ServiceSpec, version: u64, context: &str) -> Result<(), ContainerError> {
        self.docker
            .update_service(id, spec, version)
            .await
            .map_err(|e| BackendError::from_docker(context, e))?;
        Ok(())
    }

    /// Poll until no task of the service is running, or until `timeout`
    /// has elapsed. Never waits longer than `timeout`.
    async fn wait_for_drain(&self, id: &str, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            match self.docker.list_tasks(Some(id)).await {
                Ok(tasks) => {
                    let running = tasks.iter().filter(|t| is_running(t, id)).count();
                    if running == 0 {
                        tracing::debug!(service_id = %id, "Service drained");
                        return;
                    }
                    tracing::trace!(service_id = %id, running, "Waiting for service to drain");
                }
                Err(e) => {
                    tracing::warn!(service_id = %id, error = %e, "Failed to poll tasks while draining");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    service_id = %id,
                    timeout_secs = timeout.as_secs(),
                    "Service still has running tasks after stop timeout"
                );
                return;
            }
            tokio::time::sleep(self.drain_poll_interval.min(deadline - now)).await;
        }
    }
}

impl ContainerBackend for SwarmBackend {
    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        let context = format!("Failed to start service {}", id);
        let (mut spec, version) = self.current_spec(id, &context).await?;

        let replicas = replicas_of(&spec);
        set_replicas(&mut spec, if replicas <= 0 { 1 } else { replicas });
        let task_template = spec.task_template.get_or_insert_with(Default::default);
        if task_template.restart_policy.is_none() {
            task_template.restart_policy = Some(restart_policy(TaskSpecRestartPolicyConditionEnum::ANY));
        }
        force_update(task_template);

        self.update(id, spec, version, &context).await?;
        tracing::info!(service_id = %id, "Service started");
        Ok(())
    }

    async fn stop(&self, id: &str, timeout_secs: Option<u64>) -> Result<(), ContainerError> {
        let context = format!("Failed to stop service {}", id);
        let (mut spec, version) = self.current_spec(id, &context).await?;

        set_replicas(&mut spec, 0);
        let task_template = spec.task_template.get_or_insert_with(Default::default);
        if task_template
            .restart_policy
            .as_ref()
            .and_then(|p| p.condition.as_ref())
            .is_none()
        {
            let policy = task_template.restart_policy.get_or_insert_with(Default::default);
            policy.condition = Some(TaskSpecRestartPolicyConditionEnum::NONE);
        }
        force_update(task_template);

        self.update(id, spec, version, &context).await?;

        let timeout = Duration::from_secs(u64::from(
            base::stop_timeout(timeout_secs.unwrap_or(self.default_stop_timeout_secs)).unsigned_abs(),
        ));
        self.wait_for_drain(id, timeout).await;
        tracing::info!(service_id = %id, "Service stopped");
        Ok(())
    }

    async fn deploy(&self, config: &DeployConfig) -> Result<String, ContainerError> {
        base::validate_config(config)?;

        let name = config
            .name
            .clone()
            .unwrap_or_else(|| base::generate_name(NAME_PREFIX));
        let spec = service_spec(&name, config);

        let id = self
            .docker
            .create_service(spec)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to create service {}", name), e))?;

        tracing::info!(
            service_id = %id,
            name = %name,
            image = %config.image,
            replicas = config.replicas,
            "Service deployed"
        );
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<ContainerInfo>, ContainerError> {
        let services = self
            .docker
            .list_services()
            .await
            .map_err(|e| BackendError::from_docker("Failed to list services", e))?;

        // Without tasks every service still lists, just as pending.
        let tasks = match self.docker.list_tasks(None).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list tasks, reporting no running replicas");
                Vec::new()
            }
        };

        Ok(services.iter().map(|s| service_info(s, &tasks)).collect())
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .delete_service(id)
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to remove service {}", id), e))?;
        tracing::info!(service_id = %id, "Service removed");
        Ok(())
    }

    async fn logs(&self, id: &str, query: &LogQuery) -> Result<Vec<LogEntry>, ContainerError> {
        let tasks = self
            .docker
            .list_tasks(Some(id))
            .await
            .map_err(|e| BackendError::from_docker(format!("Failed to get logs for service {}", id), e))?;

        let (entries, failures) = collect_task_logs(self.docker.as_ref(), &self.parser, id, &tasks, query).await;
        for failure in &failures {
            tracing::warn!(
                service_id = %id,
                task_id = %failure.task_id,
                container_id = %failure.container_id,
                error = %failure.error,
                "Could not fetch task logs"
            );
        }
        Ok(entries)
    }
}

/// Fetch and parse logs of every live task of `service_id` concurrently.
///
/// A failing task contributes nothing and is reported as a
/// [`PartialFailure`]. The combined entries are ordered by timestamp; the
/// sort is stable so lines sharing a timestamp keep per-task order.
pub async fn collect_task_logs(
    docker: &dyn DockerOps,
    parser: &LogParser,
    service_id: &str,
    tasks: &[Task],
    query: &LogQuery,
) -> (Vec<LogEntry>, Vec<PartialFailure>) {
    let targets: Vec<(String, String)> = tasks
        .iter()
        .filter(|t| t.service_id.as_deref() == Some(service_id))
        .filter(|t| {
            matches!(
                t.desired_state,
                Some(TaskState::RUNNING) | Some(TaskState::ACCEPTED)
            )
        })
        .filter_map(|t| {
            let container_id = t
                .status
                .as_ref()
                .and_then(|s| s.container_status.as_ref())
                .and_then(|cs| cs.container_id.clone())
                .filter(|cid| !cid.is_empty())?;
            Some((t.id.clone().unwrap_or_default(), container_id))
        })
        .collect();

    let fetches = targets.iter().map(|(task_id, container_id)| async move {
        docker
            .container_logs(container_id, query)
            .await
            .map(|raw| parser.parse(&raw))
            .map_err(|e| PartialFailure {
                task_id: task_id.clone(),
                container_id: container_id.clone(),
                error: e.to_string(),
            })
    });

    let mut entries = Vec::new();
    let mut failures = Vec::new();
    for result in join_all(fetches).await {
        match result {
            Ok(mut parsed) => entries.append(&mut parsed),
            Err(failure) => failures.push(failure),
        }
    }
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    (entries, failures)
}

/// Collapse desired and running replica counts into one status word.
pub fn aggregate_status(desired_replicas: i64, running_tasks: usize) -> &'static str {
    if desired_replicas <= 0 {
        "stopped"
    } else if running_tasks as i64 == desired_replicas {
        "running"
    } else if running_tasks > 0 {
        "partial"
    } else {
        "pending"
    }
}

fn is_running(task: &Task, service_id: &str) -> bool {
    task.service_id.as_deref() == Some(service_id)
        && task
            .status
            .as_ref()
            .and_then(|s| s.state.as_ref())
            .is_some_and(|s| matches!(s, TaskState::RUNNING))
}

fn is_desired_running(task: &Task, service_id: &str) -> bool {
    task.service_id.as_deref() == Some(service_id)
        && matches!(task.desired_state, Some(TaskState::RUNNING))
}

fn replicas_of(spec: &ServiceSpec) -> i64 {
    spec.mode
        .as_ref()
        .and_then(|m| m.replicated.as_ref())
        .and_then(|r| r.replicas)
        .unwrap_or(0)
}

fn set_replicas(spec: &mut ServiceSpec, replicas: i64) {
    spec.mode = Some(ServiceSpecMode {
        replicated: Some(ServiceSpecModeReplicated {
            replicas: Some(replicas),
        }),
        ..Default::default()
    });
}

fn force_update(task_template: &mut TaskSpec) {
    let current_force = task_template.force_update.unwrap_or(0);
    task_template.force_update = Some(current_force + 1);
}

fn restart_policy(condition: TaskSpecRestartPolicyConditionEnum) -> TaskSpecRestartPolicy {
    TaskSpecRestartPolicy {
        condition: Some(condition),
        ..Default::default()
    }
}

/// Build the service spec for a deploy request.
fn service_spec(name: &str, config: &DeployConfig) -> ServiceSpec {
    let env = config.env_pairs();
    let mounts: Vec<Mount> = config
        .volumes
        .iter()
        .flatten()
        .map(|v| Mount {
            target: Some(v.container_path.clone()),
            source: Some(v.host_path.clone()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(v.is_read_only()),
            ..Default::default()
        })
        .collect();
    let ports = endpoint_ports(config.ports.as_deref().unwrap_or_default());
    let condition = if config.restart_policy {
        TaskSpecRestartPolicyConditionEnum::ANY
    } else {
        TaskSpecRestartPolicyConditionEnum::NONE
    };

    ServiceSpec {
        name: Some(name.to_string()),
        mode: Some(ServiceSpecMode {
            replicated: Some(ServiceSpecModeReplicated {
                replicas: Some(i64::from(config.replicas)),
            }),
            ..Default::default()
        }),
        task_template: Some(TaskSpec {
            container_spec: Some(TaskSpecContainerSpec {
                image: Some(config.image.clone()),
                env: if env.is_empty() { None } else { Some(env) },
                mounts: if mounts.is_empty() { None } else { Some(mounts) },
                ..Default::default()
            }),
            restart_policy: Some(restart_policy(condition)),
            networks: config.network.as_ref().map(|n| {
                vec![NetworkAttachmentConfig {
                    target: Some(n.clone()),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        }),
        labels: config.labels.clone(),
        endpoint_spec: if ports.is_empty() {
            None
        } else {
            Some(EndpointSpec {
                ports: Some(ports),
                ..Default::default()
            })
        },
        ..Default::default()
    }
}

/// Ingress publication rules; bindings without a target port are dropped.
fn endpoint_ports(ports: &[PortBinding]) -> Vec<EndpointPortConfig> {
    ports
        .iter()
        .filter(|p| p.container_port != 0)
        .map(|p| EndpointPortConfig {
            protocol: Some(match p.protocol.to_lowercase().as_str() {
                "udp" => EndpointPortConfigProtocolEnum::UDP,
                "sctp" => EndpointPortConfigProtocolEnum::SCTP,
                _ => EndpointPortConfigProtocolEnum::TCP,
            }),
            target_port: Some(i64::from(p.container_port)),
            published_port: if p.host_port > 0 {
                Some(i64::from(p.host_port))
            } else {
                None
            },
            publish_mode: Some(EndpointPortConfigPublishModeEnum::INGRESS),
            ..Default::default()
        })
        .collect()
}

/// `published:target/proto`, or `target/proto` when nothing is published.
/// A missing or empty protocol reads as tcp.
fn port_label(p: &EndpointPortConfig) -> String {
    let protocol = p
        .protocol
        .as_ref()
        .map(|pr| pr.to_string())
        .filter(|pr| !pr.is_empty())
        .unwrap_or_else(|| "tcp".to_string());
    let target = p.target_port.unwrap_or(0);
    match p.published_port.filter(|port| *port > 0) {
        Some(published) => format!("{}:{}/{}", published, target, protocol),
        None => format!("{}/{}", target, protocol),
    }
}

/// Normalize a service and its tasks.
fn service_info(s: &Service, tasks: &[Task]) -> ContainerInfo {
    let id = s.id.clone().unwrap_or_default();
    let spec = s.spec.as_ref();
    let container_spec = spec
        .and_then(|sp| sp.task_template.as_ref())
        .and_then(|tt| tt.container_spec.as_ref());

    let desired = spec.map(replicas_of).unwrap_or(0);
    let running = tasks.iter().filter(|t| is_desired_running(t, &id)).count();

    let ports = s
        .endpoint
        .as_ref()
        .and_then(|ep| ep.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(port_label)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let env: HashMap<String, String> = container_spec
        .and_then(|cs| cs.env.as_ref())
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| {
                    let (key, value) = line.split_once('=').unwrap_or((line.as_str(), ""));
                    (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    ContainerInfo {
        name: spec.and_then(|sp| sp.name.clone()).unwrap_or_default(),
        image: container_spec
            .and_then(|cs| cs.image.clone())
            .unwrap_or_default(),
        status: aggregate_status(desired, running).to_string(),
        ports: base::sort_ports(ports),
        created_at: base::iso_from_rfc3339(s.created_at.as_deref()),
        labels: spec.and_then(|sp| sp.labels.clone()),
        env: Some(env),
        id,
    }
}
