//! Persisted job-state record.
//!
//! One row per job name, shared by every service instance, describing the
//! latest run. Replaces any in-process "is it running" flag.

use crate::{JobRunStatus, PulseError, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phase of the latest run of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// A run has started and not finished.
    Running,
    /// The latest run completed.
    Succeeded,
    /// The latest run failed.
    Failed,
}

impl JobPhase {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Checks whether the phase is terminal.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl From<JobRunStatus> for JobPhase {
    fn from(status: JobRunStatus) -> Self {
        match status {
            JobRunStatus::Success => Self::Succeeded,
            JobRunStatus::Error => Self::Failed,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPhase {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(PulseError::internal(format!("Unknown job phase in storage: {}", other))),
        }
    }
}

/// Latest known state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobState {
    /// Job name, primary key.
    pub job_name: String,
    /// Phase of the latest run.
    pub phase: JobPhase,
    /// Run that produced this state.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub run_id: RunId,
    /// Result summary or error message once finished.
    pub message: Option<String>,
    /// When the latest run started.
    pub started_at: DateTime<Utc>,
    /// When the latest run finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Last time this record was written.
    pub updated_at: DateTime<Utc>,
}

impl JobState {
    /// State for a run that just started.
    #[must_use]
    pub fn started(job_name: impl Into<String>, run_id: RunId, at: DateTime<Utc>) -> Self {
        Self {
            job_name: job_name.into(),
            phase: JobPhase::Running,
            run_id,
            message: None,
            started_at: at,
            finished_at: None,
            updated_at: at,
        }
    }

    /// Moves the state to a terminal phase.
    #[must_use]
    pub fn finish(mut self, status: JobRunStatus, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.phase = status.into();
        self.message = Some(message.into());
        self.finished_at = Some(at);
        self.updated_at = at;
        self
    }

    /// Checks whether the latest run is still in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == JobPhase::Running
    }
}
