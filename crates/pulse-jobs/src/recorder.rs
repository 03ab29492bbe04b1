//! Job-run log and job-state recording.
//!
//! Write failures here are logged and counted but never returned: a job's
//! own outcome must reach its caller even when the bookkeeping is down.

use crate::metrics::JobMetrics;
use chrono::{DateTime, Utc};
use pulse_core::{Clock, JobRunLog, JobRunStatus, JobState, PulseResult, RunId};
use pulse_repository::{JobRunRepository, JobStateRepository, Repositories};
use std::sync::Arc;
use tracing::{error, info};

/// Maximum rows returned by [`JobRecorder::recent_runs`].
pub const MAX_RECENT_RUNS: u32 = 200;

/// A run that has started and not yet been recorded as finished.
#[derive(Debug, Clone)]
pub struct RunHandle {
    /// Run id shared by the log row and the state record.
    pub run_id: RunId,
    /// Job name.
    pub job_name: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

/// Writes and reads job bookkeeping.
#[derive(Clone)]
pub struct JobRecorder {
    runs: Arc<dyn JobRunRepository>,
    states: Arc<dyn JobStateRepository>,
    clock: Arc<dyn Clock>,
}

impl JobRecorder {
    /// Creates a recorder over the given repositories.
    #[must_use]
    pub fn new(runs: Arc<dyn JobRunRepository>, states: Arc<dyn JobStateRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { runs, states, clock }
    }

    /// Creates a recorder over a repository bundle.
    #[must_use]
    pub fn from_repositories(repositories: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self::new(repositories.job_runs.clone(), repositories.job_states.clone(), clock)
    }

    /// Current time according to the recorder's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Marks `job_name` as running under a fresh run id.
    pub async fn start(&self, job_name: &str) -> RunHandle {
        let handle = RunHandle {
            run_id: RunId::new(),
            job_name: job_name.to_string(),
            started_at: self.clock.now(),
        };

        let state = JobState::started(job_name, handle.run_id, handle.started_at);
        if let Err(e) = self.states.save(&state).await {
            error!(job_name = %job_name, run_id = %handle.run_id, error = %e, "Failed to mark job as running");
            JobMetrics::record_error(job_name, "state");
        }

        handle
    }

    /// Records a completed run.
    pub async fn succeed(&self, handle: &RunHandle, message: impl Into<String>) -> DateTime<Utc> {
        self.finish(handle, JobRunStatus::Success, message.into()).await
    }

    /// Records a failed run.
    pub async fn fail(&self, handle: &RunHandle, error_message: impl Into<String>) -> DateTime<Utc> {
        self.finish(handle, JobRunStatus::Error, error_message.into()).await
    }

    async fn finish(&self, handle: &RunHandle, status: JobRunStatus, message: String) -> DateTime<Utc> {
        let finished_at = self.clock.now();

        let log = match status {
            JobRunStatus::Success => JobRunLog::success(
                handle.run_id,
                handle.job_name.as_str(),
                message.as_str(),
                handle.started_at,
                finished_at,
            ),
            JobRunStatus::Error => JobRunLog::failure(
                handle.run_id,
                handle.job_name.as_str(),
                message.as_str(),
                handle.started_at,
                finished_at,
            ),
        };
        if let Err(e) = self.runs.append(&log).await {
            error!(job_name = %handle.job_name, run_id = %handle.run_id, error = %e, "Failed to write job-run log");
            JobMetrics::record_error(&handle.job_name, "log");
        }

        let state = JobState::started(handle.job_name.as_str(), handle.run_id, handle.started_at)
            .finish(status, message, finished_at);
        match self.states.complete(&state).await {
            Ok(true) => {}
            Ok(false) => {
                info!(job_name = %handle.job_name, run_id = %handle.run_id, "Job state held by a newer run, left unchanged");
            }
            Err(e) => {
                error!(job_name = %handle.job_name, run_id = %handle.run_id, error = %e, "Failed to write job state");
                JobMetrics::record_error(&handle.job_name, "state");
            }
        }

        finished_at
    }

    /// Newest log rows first, optionally for one job. `limit` is capped at
    /// [`MAX_RECENT_RUNS`].
    pub async fn recent_runs(&self, job_name: Option<&str>, limit: u32) -> PulseResult<Vec<JobRunLog>> {
        self.runs.recent(job_name, limit.min(MAX_RECENT_RUNS)).await
    }

    /// Latest state of `job_name`.
    pub async fn state(&self, job_name: &str) -> PulseResult<Option<JobState>> {
        self.states.find(job_name).await
    }

    /// Latest state of every job, ordered by name.
    pub async fn states(&self) -> PulseResult<Vec<JobState>> {
        self.states.list().await
    }
}
