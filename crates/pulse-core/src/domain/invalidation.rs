//! Invalidation scope value object.

use crate::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard accepted in legacy invalidation patterns.
pub const WILDCARD: char = '%';

/// Which cache entries an invalidation removes.
///
/// Matching is done by the repository with bound parameters; the scope never
/// reaches the database as pattern syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "key", rename_all = "snake_case")]
pub enum InvalidationScope {
    /// The single entry with this key.
    Exact(String),
    /// Every entry whose key starts with this prefix.
    Prefix(String),
    /// Every entry.
    All,
}

impl InvalidationScope {
    /// Parses a legacy `%` pattern.
    ///
    /// - `%` matches everything
    /// - `text%` matches keys starting with `text`
    /// - `text` matches exactly `text`
    ///
    /// A wildcard anywhere else is rejected.
    pub fn from_pattern(pattern: &str) -> PulseResult<Self> {
        if pattern.is_empty() {
            return Err(PulseError::validation("Invalidation pattern must not be empty"));
        }

        match pattern.find(WILDCARD) {
            None => Ok(Self::Exact(pattern.to_string())),
            Some(idx) if idx == pattern.len() - WILDCARD.len_utf8() => {
                let prefix = &pattern[..idx];
                if prefix.is_empty() {
                    Ok(Self::All)
                } else {
                    Ok(Self::Prefix(prefix.to_string()))
                }
            }
            Some(_) => Err(PulseError::validation(format!(
                "Unsupported invalidation pattern '{}': only a single trailing '{}' is allowed",
                pattern, WILDCARD
            ))),
        }
    }

    /// Builds a scope from a mode name and optional key, as sent by clients.
    pub fn from_parts(mode: InvalidationMode, key: Option<String>) -> PulseResult<Self> {
        match (mode, key) {
            (InvalidationMode::All, _) => Ok(Self::All),
            (InvalidationMode::Exact, Some(key)) if !key.is_empty() => Ok(Self::Exact(key)),
            (InvalidationMode::Prefix, Some(key)) if !key.is_empty() => Ok(Self::Prefix(key)),
            (mode, _) => Err(PulseError::validation(format!(
                "A non-empty key is required for '{}' invalidation",
                mode
            ))),
        }
    }

    /// Checks whether `key` falls inside this scope.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(exact) => key == exact,
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
            Self::All => true,
        }
    }

    /// Returns the mode of this scope.
    #[must_use]
    pub const fn mode(&self) -> InvalidationMode {
        match self {
            Self::Exact(_) => InvalidationMode::Exact,
            Self::Prefix(_) => InvalidationMode::Prefix,
            Self::All => InvalidationMode::All,
        }
    }
}

impl fmt::Display for InvalidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => write!(f, "exact:{}", key),
            Self::Prefix(prefix) => write!(f, "prefix:{}", prefix),
            Self::All => write!(f, "all"),
        }
    }
}

/// Matching mode of an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum InvalidationMode {
    /// Match one key exactly.
    Exact,
    /// Match keys starting with a prefix.
    Prefix,
    /// Match every key.
    All,
}

impl fmt::Display for InvalidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Prefix => write!(f, "prefix"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for InvalidationMode {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "prefix" => Ok(Self::Prefix),
            "all" => Ok(Self::All),
            other => Err(PulseError::validation(format!("Unknown invalidation mode: {}", other))),
        }
    }
}
