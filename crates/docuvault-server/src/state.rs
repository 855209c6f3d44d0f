//! Shared application state.

use std::sync::Arc;

use docuvault_authz::{EndpointAuthorizer, PermissionAdmin, PermissionStore, RoleSetCache};
use docuvault_database::connect_and_migrate;
use sqlx::SqlitePool;

use crate::config::{AuthConfig, ServerConfig};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub authorizer: Arc<EndpointAuthorizer>,
    pub admin: Arc<PermissionAdmin>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Build state from configuration: open the pool, run migrations, and
    /// wire the authorization stack on top of it.
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let pool = connect_and_migrate(config.database.pool_config()).await?;
        Ok(Self::with_pool(
            pool,
            &config.authorization.cache_ttl(),
            &config.authorization.store_timeout(),
            config.auth.clone(),
        ))
    }

    /// Build state around an existing pool. Used by tests with in-memory
    /// databases.
    pub fn with_pool(
        pool: SqlitePool,
        cache_ttl: &std::time::Duration,
        store_timeout: &std::time::Duration,
        auth: AuthConfig,
    ) -> Self {
        let store = PermissionStore::new(pool.clone());
        let cache = RoleSetCache::new(*cache_ttl);
        let authorizer = Arc::new(
            EndpointAuthorizer::new(store.clone(), cache).with_store_timeout(*store_timeout),
        );
        let admin = Arc::new(PermissionAdmin::new(store, Arc::clone(&authorizer)));

        Self {
            pool,
            authorizer,
            admin,
            auth: Arc::new(auth),
        }
    }
}
