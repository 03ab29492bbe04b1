//! Cache entry entity.

use crate::domain::CacheKey;
use crate::{PulseError, PulseResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A cached aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheEntry {
    /// Unique key encoding the query and its parameters.
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "metrics:github:2024-01"))]
    pub key: CacheKey,

    /// The cached computation result.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: JsonValue,

    /// Time of the last write.
    pub updated_at: DateTime<Utc>,

    /// The entry is stale from this instant on.
    pub expires_at: DateTime<Utc>,

    /// Time of the first write. Never changed by later writes.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry written at `now` that lives for `ttl`.
    ///
    /// A zero `ttl` yields an entry that is already expired.
    pub fn new(
        key: CacheKey,
        payload: JsonValue,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> PulseResult<Self> {
        let ttl = Duration::from_std(ttl)
            .map_err(|_| PulseError::validation("TTL is out of range"))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| PulseError::validation("TTL is out of range"))?;

        Ok(Self {
            key,
            payload,
            updated_at: now,
            expires_at,
            created_at: now,
        })
    }

    /// Checks whether the entry may be served at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Checks whether cleanup would remove the entry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }
}

/// Outcome of looking a key up without hiding staleness.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Present and not yet expired.
    Fresh(CacheEntry),
    /// Present but expired; not yet removed by cleanup.
    Stale(CacheEntry),
    /// No row for the key.
    Absent,
}

impl CacheLookup {
    /// Classifies an optional row against `now`.
    #[must_use]
    pub fn classify(entry: Option<CacheEntry>, now: DateTime<Utc>) -> Self {
        match entry {
            Some(entry) if entry.is_valid_at(now) => Self::Fresh(entry),
            Some(entry) => Self::Stale(entry),
            None => Self::Absent,
        }
    }

    /// Returns the entry only when fresh.
    #[must_use]
    pub fn fresh(self) -> Option<CacheEntry> {
        match self {
            Self::Fresh(entry) => Some(entry),
            Self::Stale(_) | Self::Absent => None,
        }
    }
}
