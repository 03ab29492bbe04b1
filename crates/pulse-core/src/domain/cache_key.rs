//! Cache key value object.

use crate::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum key length; matches the width of the primary-key column.
pub const MAX_KEY_LENGTH: usize = 255;

/// Separator between key segments, e.g. `metrics:github:2024-01`.
pub const KEY_SEPARATOR: char = ':';

/// A validated cache key.
///
/// Keys encode the logical query and its parameters. They are compared
/// byte-for-byte: `Metrics:x` and `metrics:x` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key after validating it.
    pub fn new(key: impl Into<String>) -> PulseResult<Self> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    /// Joins segments with [`KEY_SEPARATOR`] and validates the result.
    pub fn from_segments<I, S>(segments: I) -> PulseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(&KEY_SEPARATOR.to_string());
        Self::new(joined)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first segment (the namespace), e.g. `metrics`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.0.split(KEY_SEPARATOR).next().unwrap_or_default()
    }

    fn validate(key: &str) -> PulseResult<()> {
        if key.is_empty() {
            return Err(PulseError::validation("Cache key must not be empty"));
        }
        if key.chars().count() > MAX_KEY_LENGTH {
            return Err(PulseError::validation(format!(
                "Cache key exceeds {} characters",
                MAX_KEY_LENGTH
            )));
        }
        if key.chars().any(char::is_control) {
            return Err(PulseError::validation(
                "Cache key must not contain control characters",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CacheKey {
    type Error = PulseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = PulseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
