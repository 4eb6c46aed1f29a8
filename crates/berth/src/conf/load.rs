//! Layered configuration loading: defaults, files, `.env`, environment.

use crate::backend::BackendKind;
use crate::error::ConfigError;

use super::model::BerthConfig;

/// Config file stems tried in order; each may be any format the `config`
/// crate understands (`berth.toml`, `berth.yaml`, ...).
const CONFIG_PATHS: &[&str] = &["/etc/berth/berth", "config/berth"];

impl BerthConfig {
    /// Load configuration.
    /// Priority: legacy variables > `BERTH_*` environment > config files > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&BerthConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        for path in CONFIG_PATHS {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        // Nested keys use a double underscore: BERTH_LOGGING__LEVEL
        builder = builder.add_source(
            config::Environment::with_prefix("BERTH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: BerthConfig = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Honour the unprefixed variable names older deployments set.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("CONTAINER_STRATEGY").filter(|v| !v.trim().is_empty()) {
            self.backend = backend;
        }
        if let Some(socket) = lookup("DOCKER_SOCKET") {
            self.docker_socket = socket;
        }
    }

    /// Reject values the process cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        BackendKind::resolve(&self.backend)?;
        if self.default_stop_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "default_stop_timeout_secs".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.drain_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "drain_poll_interval_ms".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
