//! Docker trait: abstract interface for the daemon operations backends use.
//!
//! Every backend reaches the daemon through this trait.
//! `live.rs` provides the real Bollard-backed implementation.
//! `fake.rs` provides a test double.

use std::future::Future;
use std::pin::Pin;

use bollard::models::{ContainerCreateBody, ContainerSummary, Service, ServiceSpec, Task};

use crate::docker::client::DockerError;
use crate::docker::logs::LogQuery;

/// Boxed future returned by every [`DockerOps`] method.
pub type DockerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DockerError>> + Send + 'a>>;

/// Unified async interface over the Docker daemon.
///
/// Object-safe thanks to boxed futures. Implementations must be
/// `Send + Sync` so they can be shared behind an `Arc`.
pub trait DockerOps: Send + Sync {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(&self) -> DockerFuture<'_, Vec<ContainerSummary>>;

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> DockerFuture<'a, String>;

    fn start_container<'a>(&'a self, container_id: &'a str) -> DockerFuture<'a, ()>;

    fn stop_container<'a>(
        &'a self,
        container_id: &'a str,
        timeout_secs: Option<i32>,
    ) -> DockerFuture<'a, ()>;

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        force: bool,
        remove_volumes: bool,
    ) -> DockerFuture<'a, ()>;

    /// Raw log text, one `<timestamp> <stream> <message>` line per record.
    fn container_logs<'a>(
        &'a self,
        container_id: &'a str,
        query: &'a LogQuery,
    ) -> DockerFuture<'a, String>;

    // ── Swarm ───────────────────────────────────────────────────

    fn list_services(&self) -> DockerFuture<'_, Vec<Service>>;

    fn inspect_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, Service>;

    fn create_service(&self, spec: ServiceSpec) -> DockerFuture<'_, String>;

    fn update_service<'a>(
        &'a self,
        service_id: &'a str,
        spec: ServiceSpec,
        version: u64,
    ) -> DockerFuture<'a, ()>;

    fn delete_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, ()>;

    /// Tasks across the swarm, or only those of `service_id`.
    fn list_tasks<'a>(&'a self, service_id: Option<&'a str>) -> DockerFuture<'a, Vec<Task>>;
}
