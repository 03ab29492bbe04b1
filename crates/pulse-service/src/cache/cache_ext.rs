//! Typed helpers over [`CacheService`].

use super::CacheService;
use async_trait::async_trait;
use pulse_core::{CacheEntry, CacheKey, CacheLookup, PulseError, PulseResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Extension trait with typed methods for convenience.
#[async_trait]
pub trait CacheExt: CacheService {
    /// Get a typed value from the cache.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &CacheKey) -> PulseResult<Option<T>> {
        match self.get(key).await? {
            Some(payload) => Ok(Some(serde_json::from_value(payload)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value in the cache.
    async fn set_json<T: Serialize + Send + Sync>(&self, key: &CacheKey, value: &T, ttl: Duration) -> PulseResult<()> {
        let payload = serde_json::to_value(value)?;
        self.set(key, payload, ttl).await
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// - A storage failure while reading or writing is logged and the value
    ///   is computed directly.
    /// - A failed computation is answered with the stale entry when one is
    ///   still stored; otherwise the computation error is returned.
    /// - A fresh entry whose payload no longer decodes as `T` is recomputed.
    async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, ttl: Duration, compute: F) -> PulseResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = PulseResult<T>> + Send,
    {
        let stale = match self.lookup(key).await {
            Ok(CacheLookup::Fresh(entry)) => match decode::<T>(&entry) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Cached payload for '{}' does not decode, recomputing: {}", key, e);
                    None
                }
            },
            Ok(CacheLookup::Stale(entry)) => Some(entry),
            Ok(CacheLookup::Absent) => None,
            Err(e) if e.is_storage() => {
                warn!("Cache read for '{}' failed, computing directly: {}", key, e);
                None
            }
            Err(e) => return Err(e),
        };

        match compute().await {
            Ok(value) => {
                match self.set_json(key, &value, ttl).await {
                    Err(e) if e.is_storage() => {
                        warn!("Cache write for '{}' failed, returning computed value: {}", key, e);
                    }
                    other => other?,
                }
                Ok(value)
            }
            Err(compute_error) => {
                let Some(entry) = stale else {
                    return Err(compute_error);
                };
                match decode::<T>(&entry) {
                    Ok(value) => {
                        warn!(
                            "Computing '{}' failed, serving value stale since {}: {}",
                            key, entry.expires_at, compute_error
                        );
                        Ok(value)
                    }
                    Err(_) => Err(compute_error),
                }
            }
        }
    }
}

impl<S: CacheService + ?Sized> CacheExt for S {}

fn decode<T: DeserializeOwned>(entry: &CacheEntry) -> Result<T, PulseError> {
    Ok(serde_json::from_value(entry.payload.clone())?)
}
