//! Job error types.

use pulse_core::PulseError;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// A cache or storage step of the job failed.
    #[error(transparent)]
    Storage(#[from] PulseError),

    /// Scheduler error.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl JobError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Storage(e) => e.error_code(),
            JobError::Scheduler(_) => "SCHEDULER_ERROR",
            JobError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<JobError> for PulseError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Storage(e) => e,
            JobError::Scheduler(msg) => PulseError::Internal(format!("Scheduler error: {}", msg)),
            JobError::Configuration(msg) => PulseError::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_kind() {
        let err = JobError::from(PulseError::storage("connection refused"));
        assert_eq!(err.kind(), "STORAGE_ERROR");
    }

    #[test]
    fn test_storage_error_message_is_unchanged() {
        let err = JobError::from(PulseError::storage("connection refused"));
        assert_eq!(err.to_string(), "Storage error: connection refused");
    }

    #[test]
    fn test_scheduler_error() {
        let err = JobError::Scheduler("cron parse failed".into());
        assert_eq!(err.kind(), "SCHEDULER_ERROR");
        assert!(err.to_string().contains("cron parse failed"));
    }

    #[test]
    fn test_into_pulse_error() {
        let back: PulseError = JobError::from(PulseError::validation("bad")).into();
        assert!(matches!(back, PulseError::Validation(_)));

        let config: PulseError = JobError::Configuration("missing".into()).into();
        assert_eq!(config.error_code(), "CONFIGURATION_ERROR");
    }
}
