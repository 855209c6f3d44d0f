//! In-memory cache of resolved role sets.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Absolute expiration applied to every entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

struct CacheEntry {
    roles: Vec<String>,
    expires_at: Instant,
}

/// TTL cache keyed by `"{method}:{route}"`.
///
/// Entries expire absolutely, checked lazily on read; there is no background
/// sweeper. Invalidation is coarse-grained: [`RoleSetCache::invalidate_all`]
/// drops everything, trading a momentary cold start for never serving a role
/// set older than the last administrative change.
pub struct RoleSetCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

/// Counters surfaced to operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub size: u64,
}

impl RoleSetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Cache key for one endpoint lookup. Case-sensitive, exact-string.
    pub fn key(method: &str, route: &str) -> String {
        format!("{method}:{route}")
    }

    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "Role cache hit");
                    Some(entry.roles.clone())
                } else {
                    drop(entry);
                    self.entries.remove(key);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "Role cache miss (expired)");
                    None
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: String, roles: Vec<String>) {
        let entry = CacheEntry {
            roles,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Drop every entry. Returns the number of entries removed.
    pub fn invalidate_all(&self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(dropped, "Role cache invalidated");
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            size: self.entries.len() as u64,
        }
    }
}

impl Default for RoleSetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
