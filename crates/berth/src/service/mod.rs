//! Service layer: the façade over the active backend.

pub mod containers;

pub use containers::{
    ContainerService, DeployResponse, ListResponse, LogsResponse, StatusResponse,
};
