//! Job-run log entity.

use crate::{PulseError, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Final status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum JobRunStatus {
    /// The run completed.
    Success,
    /// The run failed; `message` carries the error.
    Error,
}

impl JobRunStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobRunStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(PulseError::internal(format!("Unknown job run status in storage: {}", other))),
        }
    }
}

/// One append-only row per job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobRunLog {
    /// Unique per run.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: RunId,
    /// Job name, e.g. `refresh_cache`.
    pub job_name: String,
    /// Outcome.
    pub status: JobRunStatus,
    /// Human-readable summary or error message.
    pub message: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl JobRunLog {
    /// Log row for a completed run.
    #[must_use]
    pub fn success(
        id: RunId,
        job_name: impl Into<String>,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_name: job_name.into(),
            status: JobRunStatus::Success,
            message: message.into(),
            started_at,
            finished_at,
        }
    }

    /// Log row for a failed run.
    #[must_use]
    pub fn failure(
        id: RunId,
        job_name: impl Into<String>,
        error_message: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: JobRunStatus::Error,
            ..Self::success(id, job_name, error_message, started_at, finished_at)
        }
    }

    /// Wall time the run took.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
