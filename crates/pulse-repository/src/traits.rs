//! Repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{CacheEntry, CacheKey, InvalidationScope, JobRunLog, JobState, PulseResult};

/// Storage for cache entries.
///
/// Implementations never decide expiry themselves: callers pass `now` and
/// interpret `expires_at`.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Returns the stored row for `key`, expired or not.
    async fn find_entry(&self, key: &CacheKey) -> PulseResult<Option<CacheEntry>>;

    /// Inserts the entry, or overwrites `payload`, `updated_at` and
    /// `expires_at` of an existing row. `created_at` of an existing row is
    /// left untouched.
    async fn upsert(&self, entry: &CacheEntry) -> PulseResult<()>;

    /// Deletes every row inside `scope` regardless of expiry.
    async fn delete_matching(&self, scope: &InvalidationScope) -> PulseResult<u64>;

    /// Deletes every row with `expires_at <= now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> PulseResult<u64>;

    /// Counts stored rows, expired ones included.
    async fn count(&self) -> PulseResult<u64>;
}

/// Append-only storage for job-run log rows.
#[async_trait]
pub trait JobRunRepository: Send + Sync {
    /// Appends one row.
    async fn append(&self, run: &JobRunLog) -> PulseResult<()>;

    /// Returns the newest rows first, optionally filtered by job name.
    async fn recent(&self, job_name: Option<&str>, limit: u32) -> PulseResult<Vec<JobRunLog>>;
}

/// Storage for the latest state of each job.
#[async_trait]
pub trait JobStateRepository: Send + Sync {
    /// Returns the state for `job_name`.
    async fn find(&self, job_name: &str) -> PulseResult<Option<JobState>>;

    /// Inserts or replaces the state keyed by its job name.
    async fn save(&self, state: &JobState) -> PulseResult<()>;

    /// Writes a finished state unless the row already belongs to another
    /// run. Returns `false` when a newer run owns the row and nothing was
    /// written.
    async fn complete(&self, state: &JobState) -> PulseResult<bool>;

    /// Returns every known job state ordered by job name.
    async fn list(&self) -> PulseResult<Vec<JobState>>;
}
