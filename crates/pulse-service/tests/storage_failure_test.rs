//! Cache store behaviour when storage is unavailable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{CacheEntry, CacheKey, InvalidationScope, PulseError, PulseResult, SystemClock};
use pulse_repository::CacheRepository;
use pulse_service::{CacheExt, CacheService, CacheStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Repository whose database is down.
#[derive(Default)]
struct UnavailableRepository {
    calls: AtomicUsize,
}

impl UnavailableRepository {
    fn fail<T>(&self) -> PulseResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PulseError::storage("connection refused"))
    }
}

#[async_trait]
impl CacheRepository for UnavailableRepository {
    async fn find_entry(&self, _key: &CacheKey) -> PulseResult<Option<CacheEntry>> {
        self.fail()
    }

    async fn upsert(&self, _entry: &CacheEntry) -> PulseResult<()> {
        self.fail()
    }

    async fn delete_matching(&self, _scope: &InvalidationScope) -> PulseResult<u64> {
        self.fail()
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> PulseResult<u64> {
        self.fail()
    }

    async fn count(&self) -> PulseResult<u64> {
        self.fail()
    }
}

fn store() -> (CacheStore, Arc<UnavailableRepository>) {
    let repository = Arc::new(UnavailableRepository::default());
    (CacheStore::new(repository.clone(), Arc::new(SystemClock)), repository)
}

fn key() -> CacheKey {
    CacheKey::new("metrics:github:2024-01").unwrap()
}

#[tokio::test]
async fn test_operations_surface_storage_errors() {
    let (store, repository) = store();

    assert!(store.get(&key()).await.unwrap_err().is_storage());
    assert!(store
        .set(&key(), serde_json::json!(1), Duration::from_secs(1))
        .await
        .unwrap_err()
        .is_storage());
    assert!(store.invalidate(&InvalidationScope::All).await.unwrap_err().is_storage());
    assert!(store.cleanup_expired().await.unwrap_err().is_storage());

    // One attempt each, no retries.
    assert_eq!(repository.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_get_or_compute_falls_back_to_direct_computation() {
    let (store, repository) = store();

    let value: Vec<u32> = store
        .get_or_compute(&key(), Duration::from_secs(60), || async { Ok(vec![1, 2, 3]) })
        .await
        .unwrap();

    assert_eq!(value, vec![1, 2, 3]);
    assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_get_or_compute_reports_compute_error_when_storage_is_down() {
    let (store, _) = store();

    let result: PulseResult<u32> = store
        .get_or_compute(&key(), Duration::from_secs(60), || async {
            Err(PulseError::internal("upstream unavailable"))
        })
        .await;

    assert!(matches!(result, Err(PulseError::Internal(_))));
}

#[tokio::test]
async fn test_invalid_pattern_never_reaches_storage() {
    let (store, repository) = store();

    let err = store.invalidate_pattern("a%b%").await.unwrap_err();
    assert!(matches!(err, PulseError::Validation(_)));
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}
