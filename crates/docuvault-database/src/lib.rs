//! SQLite persistence layer for DocuVault.
//!
//! Provides the connection pool wrapper used by every other crate and the
//! embedded schema migrations, including the seeded endpoint catalog that the
//! authorization subsystem resolves against.

pub mod migration;
pub mod pool;

pub use migration::{migrations, Migration, MigrationError, Migrator};
pub use pool::{DatabasePool, PoolConfig, PoolError};

use sqlx::SqlitePool;

/// Open a pool and bring the schema up to date in one call.
///
/// This is the normal entry point for binaries; tests that need a pristine
/// in-memory database go through [`PoolConfig::in_memory`] and
/// [`Migrator::run`] directly.
pub async fn connect_and_migrate(config: PoolConfig) -> Result<SqlitePool, MigrationError> {
    let pool = DatabasePool::new(config).await?.into_pool();
    Migrator::new(pool.clone()).run(&migrations()).await?;
    Ok(pool)
}
