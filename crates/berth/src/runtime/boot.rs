//! Boot: config load, logging init, Docker connection, backend selection.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::backend::Backend;
use crate::client::DockerOps;
use crate::conf::{BerthConfig, LogFormat, LoggingConfig};
use crate::docker::DockerClient;
use crate::error::ConfigError;
use crate::service::ContainerService;

/// Initialise the tracing subsystem. `RUST_LOG` wins over the configured level.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_target(true).with_thread_ids(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Load config, initialise logging, connect to Docker and pick the backend.
///
/// Any failure here is fatal: an unknown or unimplemented backend name never
/// falls through to a default.
pub async fn boot() -> Result<(ContainerService, BerthConfig), ConfigError> {
    let config = BerthConfig::load()?;
    init_logging(&config.logging);
    info!(backend = %config.backend, "Starting Berth v{}", env!("CARGO_PKG_VERSION"));

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );
    let client = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;
    let docker: Arc<dyn DockerOps> = Arc::new(client);

    let backend = Backend::from_config(&config, docker)?;
    info!(kind = ?backend.kind(), "Container backend ready");

    Ok((ContainerService::new(backend), config))
}
