//! SQL-backed cache store.

use super::CacheService;
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use pulse_core::{CacheEntry, CacheKey, CacheLookup, Clock, InvalidationScope, PulseResult};
use pulse_repository::CacheRepository;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default TTL for cached aggregates (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache store over a [`CacheRepository`].
///
/// Validity is decided against the injected [`Clock`], never the database
/// server's time.
#[derive(Clone)]
pub struct CacheStore {
    repository: Arc<dyn CacheRepository>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl CacheStore {
    /// Creates a cache store with the default TTL.
    #[must_use]
    pub fn new(repository: Arc<dyn CacheRepository>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(repository, clock, DEFAULT_TTL)
    }

    /// Creates a cache store with a custom default TTL.
    #[must_use]
    pub fn with_ttl(repository: Arc<dyn CacheRepository>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            repository,
            clock,
            default_ttl,
        }
    }

    fn observe<T>(operation: &'static str, result: PulseResult<T>) -> PulseResult<T> {
        if let Err(e) = &result {
            if e.is_storage() {
                warn!("Cache {} failed: {}", operation, e);
                CacheMetrics::storage_error(operation);
            }
        }
        result
    }
}

#[async_trait]
impl CacheService for CacheStore {
    async fn get(&self, key: &CacheKey) -> PulseResult<Option<JsonValue>> {
        Ok(self.lookup(key).await?.fresh().map(|entry| entry.payload))
    }

    async fn lookup(&self, key: &CacheKey) -> PulseResult<CacheLookup> {
        let row = Self::observe("get", self.repository.find_entry(key).await)?;
        let lookup = CacheLookup::classify(row, self.clock.now());

        match &lookup {
            CacheLookup::Fresh(_) => {
                debug!("Cache hit for key '{}'", key);
                CacheMetrics::hit(key.namespace());
            }
            CacheLookup::Stale(_) => {
                debug!("Cache entry for key '{}' is stale", key);
                CacheMetrics::miss(key.namespace(), "expired");
            }
            CacheLookup::Absent => {
                debug!("Cache miss for key '{}'", key);
                CacheMetrics::miss(key.namespace(), "absent");
            }
        }

        Ok(lookup)
    }

    async fn set(&self, key: &CacheKey, payload: JsonValue, ttl: Duration) -> PulseResult<()> {
        let entry = CacheEntry::new(key.clone(), payload, self.clock.now(), ttl)?;
        Self::observe("set", self.repository.upsert(&entry).await)?;

        debug!("Cached key '{}' until {}", key, entry.expires_at);
        CacheMetrics::write(key.namespace());
        Ok(())
    }

    async fn invalidate(&self, scope: &InvalidationScope) -> PulseResult<u64> {
        let removed = Self::observe("invalidate", self.repository.delete_matching(scope).await)?;

        info!("Invalidated {} cache entries ({})", removed, scope);
        CacheMetrics::invalidated(scope.mode(), removed);
        Ok(removed)
    }

    async fn cleanup_expired(&self) -> PulseResult<u64> {
        let now = self.clock.now();
        let removed = Self::observe("cleanup", self.repository.delete_expired(now).await)?;

        info!("Removed {} expired cache entries", removed);
        CacheMetrics::cleaned(removed);
        Ok(removed)
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("clock", &self.clock)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
