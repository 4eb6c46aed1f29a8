//! Daemon seam shared by every backend.

pub mod docker;
#[cfg(test)]
pub mod fake;
pub mod live;

pub use docker::{DockerFuture, DockerOps};
#[cfg(test)]
pub use fake::FakeDocker;
