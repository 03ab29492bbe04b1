//! Job trait.

use crate::error::JobResult;
use async_trait::async_trait;

/// A unit of work the scheduler can trigger.
#[async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs, metrics and the job-run log.
    fn name(&self) -> &str;

    /// Runs the job once and returns a human-readable summary.
    async fn execute(&self) -> JobResult<String>;
}
