//! Prometheus metrics for job runs and the scheduler.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for jobs.
pub mod names {
    /// Job runs by outcome.
    pub const JOB_RUNS_TOTAL: &str = "pulse_job_runs_total";
    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "pulse_job_duration_seconds";
    /// Unix time of the last successful run.
    pub const JOB_LAST_SUCCESS_TIMESTAMP: &str = "pulse_job_last_success_timestamp_seconds";
    /// Failures writing the job-run log or job state.
    pub const JOB_RECORD_ERRORS_TOTAL: &str = "pulse_job_record_errors_total";
    /// Scheduled jobs triggered.
    pub const SCHEDULER_JOBS_TRIGGERED: &str = "pulse_scheduler_jobs_triggered_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOB_RUNS_TOTAL, "Total number of job runs by status");
    describe_histogram!(names::JOB_DURATION_SECONDS, "Job execution duration in seconds");
    describe_gauge!(
        names::JOB_LAST_SUCCESS_TIMESTAMP,
        "Unix timestamp of the last successful run of each job"
    );
    describe_counter!(
        names::JOB_RECORD_ERRORS_TOTAL,
        "Failures writing the job-run log or job state"
    );
    describe_counter!(
        names::SCHEDULER_JOBS_TRIGGERED,
        "Total number of scheduled jobs triggered"
    );
}

/// Job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a successful run.
    pub fn job_completed(job_name: &str, duration: Duration, finished_at_unix: i64) {
        counter!(
            names::JOB_RUNS_TOTAL,
            "job_name" => job_name.to_string(),
            "status" => "success"
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "success"
        )
        .record(duration.as_secs_f64());

        gauge!(names::JOB_LAST_SUCCESS_TIMESTAMP, "job_name" => job_name.to_string())
            .set(finished_at_unix as f64);
    }

    /// Record a failed run.
    pub fn job_failed(job_name: &str, error_kind: &'static str, duration: Duration) {
        counter!(
            names::JOB_RUNS_TOTAL,
            "job_name" => job_name.to_string(),
            "status" => "error",
            "error_kind" => error_kind
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_name" => job_name.to_string(),
            "status" => "error"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed log or state write.
    pub fn record_error(job_name: &str, record: &'static str) {
        counter!(
            names::JOB_RECORD_ERRORS_TOTAL,
            "job_name" => job_name.to_string(),
            "record" => record
        )
        .increment(1);
    }
}

/// Scheduler metrics recorder.
#[derive(Clone)]
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    /// Record a scheduled job triggered.
    pub fn job_triggered(job_name: &str) {
        counter!(names::SCHEDULER_JOBS_TRIGGERED, "job_name" => job_name.to_string()).increment(1);
    }
}
