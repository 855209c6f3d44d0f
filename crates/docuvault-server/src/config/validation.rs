//! Configuration validation.

use super::types::ServerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT secret: must be at least 32 characters")]
    InvalidJwtSecret,

    #[error("Database path must not be empty")]
    InvalidDatabasePath,

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Authorization cache TTL must be greater than zero")]
    InvalidCacheTtl,

    #[error("Permission store timeout must be greater than zero")]
    InvalidStoreTimeout,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Validate server configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.len() < 32 {
        errors.push(ConfigError::InvalidJwtSecret);
    }

    if config.database.path.is_empty() {
        errors.push(ConfigError::InvalidDatabasePath);
    }

    if config.server.port == 0 {
        errors.push(ConfigError::InvalidPort(0));
    }

    if config.authorization.cache_ttl_secs == 0 {
        errors.push(ConfigError::InvalidCacheTtl);
    }

    if config.authorization.store_timeout_secs == 0 {
        errors.push(ConfigError::InvalidStoreTimeout);
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            server: ServerBindConfig {
                host: "localhost".to_string(),
                port: 8080,
                request_timeout_secs: 30,
            },
            database: DatabaseConfig {
                path: ":memory:".to_string(),
                max_connections: 1,
                min_connections: 1,
                busy_timeout_secs: 5,
            },
            auth: AuthConfig {
                jwt_secret: "a".repeat(32),
                token_expiry_secs: 3600,
            },
            authorization: AuthorizationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&test_config()).is_ok());
    }

    #[test]
    fn short_jwt_secret_rejected() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidJwtSecret)));
    }

    #[test]
    fn zero_cache_ttl_rejected() {
        let mut config = test_config();
        config.authorization.cache_ttl_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidCacheTtl)));
    }

    #[test]
    fn all_errors_collected_in_one_call() {
        let mut config = test_config();
        config.auth.jwt_secret = String::new();
        config.database.path = String::new();
        config.server.port = 0;
        config.logging.level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
