//! Prometheus metrics for the cache store.

use metrics::{counter, describe_counter};
use pulse_core::InvalidationMode;

/// Metric names for the cache store.
pub mod names {
    /// Reads that returned a fresh entry.
    pub const CACHE_HITS_TOTAL: &str = "pulse_cache_hits_total";
    /// Reads that found nothing usable.
    pub const CACHE_MISSES_TOTAL: &str = "pulse_cache_misses_total";
    /// Successful writes.
    pub const CACHE_WRITES_TOTAL: &str = "pulse_cache_writes_total";
    /// Entries removed by invalidation.
    pub const CACHE_INVALIDATED_TOTAL: &str = "pulse_cache_invalidated_entries_total";
    /// Entries removed by expiry cleanup.
    pub const CACHE_CLEANED_TOTAL: &str = "pulse_cache_cleaned_entries_total";
    /// Storage failures seen by the cache store.
    pub const CACHE_STORAGE_ERRORS_TOTAL: &str = "pulse_cache_storage_errors_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Cache reads that returned a fresh entry");
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Cache reads that found no entry or an expired one"
    );
    describe_counter!(names::CACHE_WRITES_TOTAL, "Cache entries written");
    describe_counter!(
        names::CACHE_INVALIDATED_TOTAL,
        "Cache entries removed by invalidation"
    );
    describe_counter!(
        names::CACHE_CLEANED_TOTAL,
        "Expired cache entries removed by cleanup"
    );
    describe_counter!(
        names::CACHE_STORAGE_ERRORS_TOTAL,
        "Storage failures returned by cache operations"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a fresh read.
    pub fn hit(namespace: &str) {
        counter!(names::CACHE_HITS_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a miss; `reason` is `absent` or `expired`.
    pub fn miss(namespace: &str, reason: &'static str) {
        counter!(
            names::CACHE_MISSES_TOTAL,
            "namespace" => namespace.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    /// Record a write.
    pub fn write(namespace: &str) {
        counter!(names::CACHE_WRITES_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record an invalidation.
    pub fn invalidated(mode: InvalidationMode, removed: u64) {
        counter!(names::CACHE_INVALIDATED_TOTAL, "mode" => mode.to_string()).increment(removed);
    }

    /// Record an expiry cleanup.
    pub fn cleaned(removed: u64) {
        counter!(names::CACHE_CLEANED_TOTAL).increment(removed);
    }

    /// Record a storage failure.
    pub fn storage_error(operation: &'static str) {
        counter!(names::CACHE_STORAGE_ERRORS_TOTAL, "operation" => operation).increment(1);
    }
}
