// One container lifecycle API over single-host Docker and Docker Swarm.

// Core infrastructure
pub mod client;
pub mod conf;
pub mod docker;
pub mod error;
pub mod model;

// Domain modules
pub mod backend;
pub mod filter;
pub mod logs;
pub mod runtime;
pub mod service;
