//! SQLite repository implementations.
//!
//! Timestamps are stored as Unix milliseconds so ordering and expiry
//! comparisons are plain integer comparisons.

mod cache_repository;
mod job_repository;

pub use cache_repository::SqliteCacheRepository;
pub use job_repository::{SqliteJobRunRepository, SqliteJobStateRepository};

use chrono::{DateTime, Utc};
use pulse_core::{PulseError, PulseResult};

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> PulseResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| PulseError::internal(format!("Invalid timestamp in database: {}", millis)))
}
