//! SQLite connection pool configuration and lifecycle.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to create connection pool: {0}")]
    Creation(#[from] sqlx::Error),

    #[error("Pool health check failed: {0}")]
    HealthCheck(String),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Pool settings for the DocuVault database file.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to the SQLite database file
    pub database_path: String,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
    /// Busy timeout for a locked database
    pub busy_timeout: Duration,
    /// Enable WAL mode for concurrent request handling
    pub wal_mode: bool,
    /// Create the database file if missing
    pub create_if_missing: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            database_path: "docuvault.db".to_string(),
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            wal_mode: true,
            create_if_missing: true,
        }
    }
}

impl PoolConfig {
    /// Single-connection in-memory database, used throughout the test suites.
    ///
    /// SQLite gives every connection its own `:memory:` database, so the pool
    /// is pinned to one connection.
    pub fn in_memory() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            wal_mode: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(PoolError::InvalidConfig(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        Ok(())
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, PoolError> {
        let mut options =
            SqliteConnectOptions::from_str(&format!("sqlite:{}", self.database_path))
                .map_err(|e| PoolError::InvalidConfig(e.to_string()))?
                .create_if_missing(self.create_if_missing)
                .busy_timeout(self.busy_timeout);

        if self.wal_mode {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        Ok(options)
    }
}

/// Connection pool wrapper carrying its configuration.
pub struct DatabasePool {
    pool: SqlitePool,
    config: PoolConfig,
}

impl DatabasePool {
    #[instrument(skip(config), fields(path = %config.database_path))]
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // Foreign keys are off by default in SQLite; the audit log
                    // references the endpoint registry.
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(config.connect_options()?)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db_pool = Self { pool, config };
        db_pool.health_check().await?;

        Ok(db_pool)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Consume the wrapper, keeping the pool.
    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PoolError::HealthCheck(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_in_memory_pool() {
        let pool = DatabasePool::new(PoolConfig::in_memory()).await.unwrap();

        assert!(!pool.is_closed());
        pool.health_check().await.unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn rejects_zero_max_connections() {
        let config = PoolConfig {
            max_connections: 0,
            ..PoolConfig::in_memory()
        };

        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn rejects_min_above_max() {
        let config = PoolConfig {
            min_connections: 5,
            max_connections: 2,
            ..PoolConfig::in_memory()
        };

        assert!(config.validate().is_err());
    }
}
