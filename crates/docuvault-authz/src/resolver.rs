//! The per-request authorization decision point.

use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::cache::{CacheStats, RoleSetCache};
use crate::store::PermissionStore;

/// Default bound on one permission store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves allowed role sets through the cache and decides access.
///
/// The store is the only suspension point; a slow or unreachable store is
/// degraded to "no roles found" so an authorization check can deny but never
/// hang or crash the request it guards.
pub struct EndpointAuthorizer {
    store: PermissionStore,
    cache: RoleSetCache,
    store_timeout: Duration,
}

impl EndpointAuthorizer {
    pub fn new(store: PermissionStore, cache: RoleSetCache) -> Self {
        Self {
            store,
            cache,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Bound applied to one permission store round trip.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Allowed roles for (method, route), exact-string on the registered
    /// route template. Fail-closed: any store failure yields an empty set,
    /// and the failure is not cached.
    pub async fn get_allowed_roles(&self, method: &str, route: &str) -> Vec<String> {
        let key = RoleSetCache::key(method, route);
        if let Some(roles) = self.cache.get(&key) {
            return roles;
        }

        match timeout(self.store_timeout, self.store.get_allowed_roles(method, route)).await {
            Ok(Ok(roles)) => {
                self.cache.set(key, roles.clone());
                roles
            }
            Ok(Err(err)) => {
                warn!(method, route, error = %err, "Permission lookup failed, denying");
                Vec::new()
            }
            Err(_) => {
                warn!(method, route, "Permission lookup timed out, denying");
                Vec::new()
            }
        }
    }

    /// Allow iff the caller shares at least one role with the endpoint's
    /// configured set. An endpoint with no configured roles denies everyone,
    /// whatever the caller holds.
    pub async fn check_access(&self, method: &str, route: &str, caller_roles: &[String]) -> bool {
        let allowed = self.get_allowed_roles(method, route).await;
        if allowed.is_empty() {
            return false;
        }
        caller_roles.iter().any(|r| allowed.contains(r))
    }

    /// Drop every cached role set immediately. Returns entries removed.
    pub fn invalidate_cache(&self) -> usize {
        self.cache.invalidate_all()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
