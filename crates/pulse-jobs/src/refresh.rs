//! The cache refresh job.

use crate::error::JobResult;
use crate::job::Job;
use crate::metrics::JobMetrics;
use crate::recorder::JobRecorder;
use async_trait::async_trait;
use pulse_core::InvalidationScope;
use pulse_service::CacheService;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Name under which refresh runs are logged.
pub const REFRESH_JOB_NAME: &str = "refresh_cache";

/// Counts produced by one refresh run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefreshReport {
    /// Expired entries removed by cleanup.
    pub cleaned: u64,
    /// Entries removed by the full invalidation.
    pub invalidated: u64,
}

impl fmt::Display for RefreshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cleaned {} expired entries, invalidated {} entries",
            self.cleaned, self.invalidated
        )
    }
}

/// Deletes expired entries, then invalidates every entry, and records the run.
///
/// Steps commit independently and are not rolled back when a later one
/// fails. Running it twice in a row is safe.
#[derive(Clone)]
pub struct RefreshJob {
    cache: Arc<dyn CacheService>,
    recorder: JobRecorder,
}

impl RefreshJob {
    /// Creates the job.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheService>, recorder: JobRecorder) -> Self {
        Self { cache, recorder }
    }

    /// Returns the recorder this job writes to.
    #[must_use]
    pub fn recorder(&self) -> &JobRecorder {
        &self.recorder
    }

    /// Runs the refresh.
    ///
    /// A job-run log row is written whatever the outcome. On failure the row
    /// carries status `error` and the error message, and the original error
    /// is returned after it is written.
    #[instrument(skip(self), fields(job_name = REFRESH_JOB_NAME))]
    pub async fn refresh(&self) -> JobResult<RefreshReport> {
        let run = self.recorder.start(REFRESH_JOB_NAME).await;
        let timer = Instant::now();

        let outcome = self.run_steps().await;

        match &outcome {
            Ok(report) => {
                let finished_at = self.recorder.succeed(&run, report.to_string()).await;
                info!(run_id = %run.run_id, cleaned = report.cleaned, invalidated = report.invalidated, "Cache refresh completed");
                JobMetrics::job_completed(REFRESH_JOB_NAME, timer.elapsed(), finished_at.timestamp());
            }
            Err(e) => {
                self.recorder.fail(&run, e.to_string()).await;
                error!(run_id = %run.run_id, error = %e, "Cache refresh failed");
                JobMetrics::job_failed(REFRESH_JOB_NAME, e.kind(), timer.elapsed());
            }
        }

        outcome
    }

    async fn run_steps(&self) -> JobResult<RefreshReport> {
        let cleaned = self.cache.cleanup_expired().await?;
        let invalidated = self.cache.invalidate(&InvalidationScope::All).await?;
        Ok(RefreshReport { cleaned, invalidated })
    }
}

#[async_trait]
impl Job for RefreshJob {
    fn name(&self) -> &str {
        REFRESH_JOB_NAME
    }

    async fn execute(&self) -> JobResult<String> {
        Ok(self.refresh().await?.to_string())
    }
}
