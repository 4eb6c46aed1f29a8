//! Live: implements `DockerOps` for the real Bollard-backed `DockerClient`.

use bollard::models::{ContainerCreateBody, ContainerSummary, Service, ServiceSpec, Task};

use crate::client::docker::{DockerFuture, DockerOps};
use crate::docker::client::DockerClient;
use crate::docker::logs::LogQuery;

impl DockerOps for DockerClient {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(&self) -> DockerFuture<'_, Vec<ContainerSummary>> {
        Box::pin(self.list_containers())
    }

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> DockerFuture<'a, String> {
        Box::pin(self.create_container(name, body))
    }

    fn start_container<'a>(&'a self, container_id: &'a str) -> DockerFuture<'a, ()> {
        Box::pin(self.start_container(container_id))
    }

    fn stop_container<'a>(
        &'a self,
        container_id: &'a str,
        timeout_secs: Option<i32>,
    ) -> DockerFuture<'a, ()> {
        Box::pin(self.stop_container(container_id, timeout_secs))
    }

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        force: bool,
        remove_volumes: bool,
    ) -> DockerFuture<'a, ()> {
        Box::pin(self.remove_container(container_id, force, remove_volumes))
    }

    fn container_logs<'a>(
        &'a self,
        container_id: &'a str,
        query: &'a LogQuery,
    ) -> DockerFuture<'a, String> {
        Box::pin(self.container_logs(container_id, query))
    }

    // ── Swarm ───────────────────────────────────────────────────

    fn list_services(&self) -> DockerFuture<'_, Vec<Service>> {
        Box::pin(self.list_services())
    }

    fn inspect_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, Service> {
        Box::pin(self.inspect_service(service_id))
    }

    fn create_service(&self, spec: ServiceSpec) -> DockerFuture<'_, String> {
        Box::pin(self.create_service(spec))
    }

    fn update_service<'a>(
        &'a self,
        service_id: &'a str,
        spec: ServiceSpec,
        version: u64,
    ) -> DockerFuture<'a, ()> {
        Box::pin(self.update_service(service_id, spec, version))
    }

    fn delete_service<'a>(&'a self, service_id: &'a str) -> DockerFuture<'a, ()> {
        Box::pin(self.delete_service(service_id))
    }

    fn list_tasks<'a>(&'a self, service_id: Option<&'a str>) -> DockerFuture<'a, Vec<Task>> {
        Box::pin(self.list_tasks(service_id))
    }
}
