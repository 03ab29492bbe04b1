//! Cache service trait.

use async_trait::async_trait;
use pulse_core::{CacheKey, CacheLookup, InvalidationScope, PulseResult};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Durable TTL cache for computed aggregates.
///
/// Every call is a round trip to storage; nothing is cached in process.
/// Storage failures surface as [`pulse_core::PulseError::Storage`] and are
/// never retried here.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the payload when the entry exists and has not expired.
    ///
    /// Absent and expired both report `None`.
    async fn get(&self, key: &CacheKey) -> PulseResult<Option<JsonValue>>;

    /// Returns the entry classified as fresh, stale or absent.
    async fn lookup(&self, key: &CacheKey) -> PulseResult<CacheLookup>;

    /// Writes `payload` under `key`, expiring `ttl` from now.
    ///
    /// An existing entry keeps its creation time. Concurrent writers to one
    /// key are last-write-wins.
    async fn set(&self, key: &CacheKey, payload: JsonValue, ttl: Duration) -> PulseResult<()>;

    /// Deletes every entry in `scope` regardless of expiry and returns the count.
    async fn invalidate(&self, scope: &InvalidationScope) -> PulseResult<u64>;

    /// Deletes every entry whose expiry has passed and returns the count.
    async fn cleanup_expired(&self) -> PulseResult<u64>;

    /// TTL used by callers that do not choose one.
    fn default_ttl(&self) -> Duration;

    /// Parses a legacy `%` pattern and invalidates the matching scope.
    async fn invalidate_pattern(&self, pattern: &str) -> PulseResult<u64> {
        let scope = InvalidationScope::from_pattern(pattern)?;
        self.invalidate(&scope).await
    }
}
