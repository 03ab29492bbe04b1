//! Cache key builders for consistent key naming.
//!
//! Keys are `namespace:source:parameters...`, e.g. `metrics:github:2024-01`.
//! Every key built here shares its namespace prefix with the matching
//! `*_prefix` function so a whole family can be invalidated at once.

use chrono::NaiveDate;
use pulse_core::{CacheKey, InvalidationScope, PulseResult, KEY_SEPARATOR};

/// Namespace for repository and chain metrics.
pub const METRICS: &str = "metrics";
/// Namespace for developer activity.
pub const DEVELOPERS: &str = "developers";
/// Namespace for social engagement.
pub const SOCIAL: &str = "social";
/// Namespace for on-chain metrics.
pub const ONCHAIN: &str = "onchain";

fn month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Monthly commit counts for a source, e.g. `metrics:github:2024-01`.
pub fn monthly_commits(source: &str, month_of: NaiveDate) -> PulseResult<CacheKey> {
    CacheKey::from_segments([METRICS, source, month(month_of).as_str()])
}

/// Active developers in a month, optionally restricted to one repository.
pub fn developer_activity(month_of: NaiveDate, repository: Option<&str>) -> PulseResult<CacheKey> {
    let period = month(month_of);
    match repository {
        Some(repo) => CacheKey::from_segments([DEVELOPERS, "activity", period.as_str(), repo]),
        None => CacheKey::from_segments([DEVELOPERS, "activity", period.as_str()]),
    }
}

/// Engagement summary for a social channel, e.g. `social:discourse:30d`.
pub fn social_engagement(channel: &str, window_days: u32) -> PulseResult<CacheKey> {
    CacheKey::from_segments([SOCIAL, channel, format!("{}d", window_days).as_str()])
}

/// A named on-chain query result for a day, e.g. `onchain:tvl:2024-01-15`.
pub fn onchain_metric(query: &str, day: NaiveDate) -> PulseResult<CacheKey> {
    CacheKey::from_segments([ONCHAIN, query, day.format("%Y-%m-%d").to_string().as_str()])
}

/// Scope covering every key in `namespace`.
#[must_use]
pub fn namespace_scope(namespace: &str) -> InvalidationScope {
    InvalidationScope::Prefix(format!("{}{}", namespace, KEY_SEPARATOR))
}
