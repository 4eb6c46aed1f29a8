//! Docker daemon access through bollard.

pub mod client;
pub mod container;
pub mod logs;
pub mod swarm;

pub use client::{DockerClient, DockerError};
pub use logs::LogQuery;
