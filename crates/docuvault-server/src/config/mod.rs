//! Server configuration.
//!
//! Three layered sources, later ones winning: compiled-in defaults, an
//! optional TOML file named by `CONFIG_PATH`, then `DOCUVAULT`-prefixed
//! environment variables (`DOCUVAULT__SERVER__PORT=9090`).

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::*;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

impl ServerConfig {
    /// Load configuration, reading the file path from `CONFIG_PATH` if set.
    pub fn load() -> Result<Self> {
        Self::load_from(std::env::var("CONFIG_PATH").ok().as_deref())
    }

    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("defaults.toml"),
            config::FileFormat::Toml,
        ));

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                info!(path, "Loading config file");
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        builder
            .add_source(
                config::Environment::with_prefix("DOCUVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Configuration did not match the expected shape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_but_fail_validation_on_the_placeholder_secret() {
        let config = ServerConfig::load_from(None).unwrap();
        assert_eq!(config.authorization.cache_ttl_secs, 1800);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidJwtSecret)));
    }
}
