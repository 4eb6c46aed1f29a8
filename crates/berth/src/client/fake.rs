//! Fake: test double for Docker operations.
//!
//! Provides a deterministic [`FakeDocker`] that implements [`DockerOps`]
//! using in-memory state. Backends and the façade are tested against it
//! without a running Docker daemon.
//!
//! Beyond plain storage the fake keeps a call journal, can be told to fail
//! a named operation or one container's log fetch, can delay a log fetch,
//! and drains a service's tasks when its replicas are scaled to zero.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bollard::models::{
    ContainerCreateBody, ContainerStatus, ContainerSummary, ContainerSummaryStateEnum,
    ObjectVersion, PortSummary, PortSummaryTypeEnum, Service, ServiceSpec, ServiceSpecMode,
    ServiceSpecModeReplicated, Task, TaskState, TaskStatus,
};
use tokio::sync::Mutex;

use crate::client::docker::{DockerFuture, DockerOps};
use crate::docker::client::DockerError;
use crate::docker::logs::LogQuery;

// ── In-memory state ─────────────────────────────────────────────

/// A canned container for the fake store.
#[derive(Clone, Debug)]
pub struct FakeContainer {
    pub summary: ContainerSummary,
    /// Raw log text in the tagged `<timestamp> <stream> <message>` shape.
    pub logs: String,
}

/// Mutable inner state protected by a mutex.
#[derive(Default)]
struct Inner {
    containers: Vec<FakeContainer>,
    created: Vec<(String, ContainerCreateBody)>,
    services: Vec<Service>,
    tasks: Vec<Task>,
    calls: Vec<String>,
    failures: HashMap<String, String>,
    log_failures: HashSet<String>,
    log_delays: HashMap<String, Duration>,
    hold_tasks: bool,
    next_id: u64,
}

impl Inner {
    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    fn check(&self, op: &str) -> Result<(), DockerError> {
        match self.failures.get(op) {
            Some(message) => Err(DockerError::UnexpectedResponse(message.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:04}", prefix, self.next_id)
    }

    fn container_mut(&mut self, id: &str) -> Result<&mut FakeContainer, DockerError> {
        self.containers
            .iter_mut()
            .find(|c| c.summary.id.as_deref() == Some(id))
            .ok_or_else(|| DockerError::ContainerNotFound(id.to_string()))
    }

    fn service_mut(&mut self, id: &str) -> Result<&mut Service, DockerError> {
        self.services
            .iter_mut()
            .find(|s| s.id.as_deref() == Some(id))
            .ok_or_else(|| DockerError::ServiceNotFound(id.to_string()))
    }
}

/// A fake Docker client for deterministic testing.
///
/// All methods operate on in-memory state. The seed methods allow
/// pre-populating containers, services and tasks before running test code.
pub struct FakeDocker {
    inner: Mutex<Inner>,
}

impl FakeDocker {
    /// Create an empty fake Docker client.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed a container into the fake store.
    pub async fn add_container(&self, container: FakeContainer) {
        self.inner.lock().await.containers.push(container);
    }

    /// Seed a service.
    pub async fn add_service(&self, service: Service) {
        self.inner.lock().await.services.push(service);
    }

    /// Seed a task.
    pub async fn add_task(&self, task: Task) {
        self.inner.lock().await.tasks.push(task);
    }

    /// Make every call of `op` (a `DockerOps` method name) fail.
    pub async fn fail(&self, op: &str, message: &str) {
        self.inner
            .lock()
            .await
            .failures
            .insert(op.to_string(), message.to_string());
    }

    /// Make log fetches for one container fail.
    pub async fn fail_logs(&self, container_id: &str) {
        self.inner
            .lock()
            .await
            .log_failures
            .insert(container_id.to_string());
    }

    /// Delay log fetches for one container.
    pub async fn delay_logs(&self, container_id: &str, delay: Duration) {
        self.inner
            .lock()
            .await
            .log_delays
            .insert(container_id.to_string(), delay);
    }

    /// Keep tasks running when a service is scaled to zero.
    pub async fn hold_tasks(&self) {
        self.inner.lock().await.hold_tasks = true;
    }

    /// Every call made so far, as `op` or `op:arg`.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    /// Container create requests in order, keyed by requested name.
    pub async fn created_containers(&self) -> Vec<(String, ContainerCreateBody)> {
        self.inner.lock().await.created.clone()
    }

    /// Current snapshot of a stored service.
    pub async fn service(&self, id: &str) -> Option<Service> {
        let state = self.inner.lock().await;
        state.services.iter().find(|s| s.id.as_deref() == Some(id)).cloned()
    }

    /// Current snapshot of a stored container.
    pub async fn container(&self, id: &str) -> Option<ContainerSummary> {
        let state = self.inner.lock().await;
        state
            .containers
            .iter()
            .find(|c| c.summary.id.as_deref() == Some(id))
            .map(|c| c.summary.clone())
    }
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::new()
    }
}

// ── Builders for seeded objects ─────────────────────────────────

/// A container summary with the fields backends read.
pub fn fake_container(id: &str, name: &str, image: &str, state: ContainerSummaryStateEnum) -> FakeContainer {
    FakeContainer {
        summary: ContainerSummary {
            id: Some(id.to_string()),
            names: Some(vec![format!("/{}", name)]),
            image: Some(image.to_string()),
            state: Some(state),
            created: Some(1_700_000_000),
            ..Default::default()
        },
        logs: String::new(),
    }
}

/// A replicated service with version index 1.
pub fn fake_service(id: &str, name: &str, image: &str, replicas: i64) -> Service {
    Service {
        id: Some(id.to_string()),
        version: Some(ObjectVersion { index: Some(1) }),
        created_at: Some("2024-01-01T00:00:00.000000000Z".to_string()),
        spec: Some(ServiceSpec {
            name: Some(name.to_string()),
            mode: Some(ServiceSpecMode {
                replicated: Some(ServiceSpecModeReplicated {
                    replicas: Some(replicas),
                }),
                ..Default::default()
            }),
            task_template: Some(bollard::models::TaskSpec {
                container_spec: Some(bollard::models::TaskSpecContainerSpec {
                    image: Some(image.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A task of `service_id` with the given desired and observed states.
pub fn fake_task(
    id: &str,
    service_id: &str,
    desired: TaskState,
    state: TaskState,
    container_id: Option<&str>,
) -> Task {
    Task {
        id: Some(id.to_string()),
        service_id: Some(service_id.to_string()),
        desired_state: Some(desired),
        status: Some(TaskStatus {
            state: Some(state),
            container_status: container_id.map(|cid| ContainerStatus {
                container_id: Some(cid.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Translate a create body's port bindings into list-style port summaries.
fn summary_ports(body: &ContainerCreateBody) -> Vec<PortSummary> {
    let Some(bindings) = body.host_config.as_ref().and_then(|h| h.port_bindings.as_ref()) else {
        return Vec::new();
    };
    let mut ports = Vec::new();
    for (key, hosts) in bindings {
        let (port, proto) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
        let Ok(private_port) = port.parse::<u16>() else { continue };
        let typ = match proto {
            "udp" => PortSummaryTypeEnum::UDP,
            "sctp" => PortSummaryTypeEnum::SCTP,
            _ => PortSummaryTypeEnum::TCP,
        };
        let public_port = hosts
            .as_ref()
            .and_then(|h| h.first())
            .and_then(|b| b.host_port.as_deref())
            .and_then(|p| p.parse::<u16>().ok());
        ports.push(PortSummary {
            private_port,
            public_port,
            typ: Some(typ),
            ..Default::default()
        });
    }
    ports
}

fn replicas_of(spec: &ServiceSpec) -> Option<i64> {
    spec.mode
        .as_ref()
        .and_then(|m| m.replicated.as_ref())
        .and_then(|r| r.replicas)
}

// ── DockerOps implementation ────────────────────────────────────

impl DockerOps for FakeDocker {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(&self) -> DockerFuture<'_, Vec<ContainerSummary>> {
        Box::pin(async {
            let mut state = self.inner.lock().await;
            state.record("list_containers");
            state.check("list_containers")?;
            Ok(state.containers.iter().map(|c| c.summary.clone()).collect())
        })
    }

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> DockerFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("create_container:{}", name));
            state.check("create_container")?;

            let id = state.next_id("cid");
            let summary = ContainerSummary {
                id: Some(id.clone()),
                names: Some(vec![format!("/{}", name)]),
                image: body.image.clone(),
                state: Some(ContainerSummaryStateEnum::CREATED),
                created: Some(chrono::Utc::now().timestamp()),
                labels: body.labels.clone(),
                ports: Some(summary_ports(&body)),
                ..Default::default()
            };
            state.containers.push(FakeContainer {
                summary,
                logs: String::new(),
            });
            state.created.push((name.to_string(), body));
            Ok(id)
        })
    }

    fn start_container<'a>(&'a self, container_id: &'a str) -> DockerFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("start_container:{}", container_id));
            state.check("start_container")?;
            state.container_mut(container_id)?.summary.state = Some(ContainerSummaryStateEnum::RUNNING);
            Ok(())
        })
    }

    fn stop_container<'a>(
        &'a self,
        container_id: &'a str,
        timeout_secs: Option<i32>,
    ) -> DockerFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            let timeout = timeout_secs.map(|t| t.to_string()).unwrap_or_default();
            state.record(format!("stop_container:{}:{}", container_id, timeout));
            state.check("stop_container")?;
            state.container_mut(container_id)?.summary.state = Some(ContainerSummaryStateEnum::EXITED);
            Ok(())
        })
    }

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        _force: bool,
        _remove_volumes: bool,
    ) -> DockerFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("remove_container:{}", container_id));
            state.check("remove_container")?;
            state.container_mut(container_id)?;
            state
                .containers
                .retain(|c| c.summary.id.as_deref() != Some(container_id));
            Ok(())
        })
    }

    fn container_logs<'a>(
        &'a self,
        container_id: &'a str,
        _query: &'a LogQuery,
    ) -> DockerFuture<'a, String> {
        Box::pin(async move {
            let delay = {
                let mut state = self.inner.lock().await;
                state.record(format!("container_logs:{}", container_id));
                state.check("container_logs")?;
                state.log_delays.get(container_id).copied()
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.inner.lock().await;
            if state.log_failures.contains(container_id) {
                return Err(DockerError::UnexpectedResponse(format!(
                    "log stream for {} broke",
                    container_id
                )));
            }
            Ok(state.container_mut(container_id)?.logs.clone())
        })
    }

    // ── Swarm ───────────────────────────────────────────────────

    fn list_services(&self) -> DockerFuture<'_, Vec<Service>> {
        Box::pin(async {
            let mut state = self.inner.lock().await;
            state.record("list_services");
            state.check("list_services")?;
            Ok(state.services.clone())
        })
    }

    fn inspect_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, Service> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("inspect_service:{}", service_id));
            state.check("inspect_service")?;
            state.service_mut(service_id).map(|s| s.clone())
        })
    }

    fn create_service(&self, spec: ServiceSpec) -> DockerFuture<'_, String> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            let name = spec.name.clone().unwrap_or_default();
            state.record(format!("create_service:{}", name));
            state.check("create_service")?;

            let id = state.next_id("svc");
            state.services.push(Service {
                id: Some(id.clone()),
                version: Some(ObjectVersion { index: Some(1) }),
                created_at: Some(chrono::Utc::now().to_rfc3339()),
                spec: Some(spec),
                ..Default::default()
            });
            Ok(id)
        })
    }

    fn update_service<'a>(
        &'a self,
        service_id: &'a str,
        spec: ServiceSpec,
        version: u64,
    ) -> DockerFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("update_service:{}", service_id));
            state.check("update_service")?;

            let drained = replicas_of(&spec) == Some(0);
            let service = state.service_mut(service_id)?;
            let current = service.version.as_ref().and_then(|v| v.index).unwrap_or(0);
            if current != version {
                return Err(DockerError::UnexpectedResponse(format!(
                    "update out of sequence: version {} is not {}",
                    version, current
                )));
            }
            service.spec = Some(spec);
            service.version = Some(ObjectVersion {
                index: Some(current + 1),
            });

            if drained && !state.hold_tasks {
                for task in state
                    .tasks
                    .iter_mut()
                    .filter(|t| t.service_id.as_deref() == Some(service_id))
                {
                    task.desired_state = Some(TaskState::SHUTDOWN);
                    if let Some(status) = task.status.as_mut() {
                        status.state = Some(TaskState::SHUTDOWN);
                    }
                }
            }
            Ok(())
        })
    }

    fn delete_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.record(format!("delete_service:{}", service_id));
            state.check("delete_service")?;
            state.service_mut(service_id)?;
            state.services.retain(|s| s.id.as_deref() != Some(service_id));
            state
                .tasks
                .retain(|t| t.service_id.as_deref() != Some(service_id));
            Ok(())
        })
    }

    fn list_tasks<'a>(&'a self, service_id: Option<&'a str>) -> DockerFuture<'a, Vec<Task>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            match service_id {
                Some(id) => state.record(format!("list_tasks:{}", id)),
                None => state.record("list_tasks"),
            }
            state.check("list_tasks")?;
            Ok(state
                .tasks
                .iter()
                .filter(|t| service_id.is_none_or(|id| t.service_id.as_deref() == Some(id)))
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_containers() {
        let fake = FakeDocker::new();
        fake.add_container(fake_container("abc123", "web", "nginx", ContainerSummaryStateEnum::RUNNING))
            .await;
        fake.add_container(fake_container("def456", "db", "postgres", ContainerSummaryStateEnum::EXITED))
            .await;

        let containers = fake.list_containers().await.unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(fake.calls().await, vec!["list_containers"]);
    }

    #[tokio::test]
    async fn test_container_lifecycle() {
        let fake = FakeDocker::new();
        fake.add_container(fake_container("abc123", "web", "nginx", ContainerSummaryStateEnum::RUNNING))
            .await;

        fake.stop_container("abc123", Some(10)).await.unwrap();
        assert_eq!(
            fake.container("abc123").await.unwrap().state,
            Some(ContainerSummaryStateEnum::EXITED)
        );

        fake.start_container("abc123").await.unwrap();
        assert_eq!(
            fake.container("abc123").await.unwrap().state,
            Some(ContainerSummaryStateEnum::RUNNING)
        );

        fake.remove_container("abc123", false, false).await.unwrap();
        assert!(fake.container("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_container_is_not_found() {
        let fake = FakeDocker::new();
        let err = fake.start_container("ghost").await.unwrap_err();
        assert!(matches!(err, DockerError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_container_records_ports() {
        let fake = FakeDocker::new();
        let mut bindings = HashMap::new();
        bindings.insert(
            "80/tcp".to_string(),
            Some(vec![bollard::models::PortBinding {
                host_ip: None,
                host_port: Some("8080".to_string()),
            }]),
        );
        let body = ContainerCreateBody {
            image: Some("nginx".to_string()),
            host_config: Some(bollard::models::HostConfig {
                port_bindings: Some(bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let id = fake.create_container("web", body).await.unwrap();
        let summary = fake.container(&id).await.unwrap();
        let ports = summary.ports.unwrap();
        assert_eq!(ports[0].private_port, 80);
        assert_eq!(ports[0].public_port, Some(8080));
        assert_eq!(fake.created_containers().await[0].0, "web");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let fake = FakeDocker::new();
        fake.fail("list_services", "daemon down").await;
        assert!(fake.list_services().await.is_err());
    }

    #[tokio::test]
    async fn test_list_tasks_scoped_to_service() {
        let fake = FakeDocker::new();
        fake.add_task(fake_task("t1", "svc1", TaskState::RUNNING, TaskState::RUNNING, Some("c1")))
            .await;
        fake.add_task(fake_task("t2", "svc2", TaskState::RUNNING, TaskState::RUNNING, Some("c2")))
            .await;

        let scoped = fake.list_tasks(Some("svc2")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id.as_deref(), Some("t2"));
        assert_eq!(fake.list_tasks(None).await.unwrap().len(), 2);
        assert_eq!(fake.calls().await, vec!["list_tasks:svc2", "list_tasks"]);
    }

    #[tokio::test]
    async fn test_scale_to_zero_drains_tasks() {
        let fake = FakeDocker::new();
        let service = fake_service("svc1", "api", "api:1", 2);
        let spec = service.spec.clone().unwrap();
        fake.add_service(service).await;
        fake.add_task(fake_task("t1", "svc1", TaskState::RUNNING, TaskState::RUNNING, Some("c1")))
            .await;

        let mut drained = spec;
        drained.mode = Some(ServiceSpecMode {
            replicated: Some(ServiceSpecModeReplicated { replicas: Some(0) }),
            ..Default::default()
        });
        fake.update_service("svc1", drained, 1).await.unwrap();

        let tasks = fake.list_tasks(Some("svc1")).await.unwrap();
        assert_eq!(tasks[0].status.as_ref().unwrap().state, Some(TaskState::SHUTDOWN));
        assert_eq!(
            fake.service("svc1").await.unwrap().version.unwrap().index,
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_update_out_of_sequence_rejected() {
        let fake = FakeDocker::new();
        let service = fake_service("svc1", "api", "api:1", 1);
        let spec = service.spec.clone().unwrap();
        fake.add_service(service).await;

        assert!(fake.update_service("svc1", spec, 7).await.is_err());
    }
}
