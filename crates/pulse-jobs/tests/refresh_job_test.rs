//! Refresh job behaviour against an in-memory SQLite database.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use pulse_core::{
    CacheKey, CacheLookup, Clock, InvalidationScope, JobPhase, JobRunLog, JobRunStatus, ManualClock, PulseError,
    PulseResult,
};
use pulse_jobs::{Job, JobRecorder, RefreshJob, RefreshReport, REFRESH_JOB_NAME};
use pulse_repository::{CacheRepository, DatabasePool, JobRunRepository, JobStateRepository, Repositories};
use pulse_service::{CacheService, CacheStore};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

struct Fixture {
    job: RefreshJob,
    cache: Arc<CacheStore>,
    clock: Arc<ManualClock>,
    repositories: Repositories,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn fixture() -> Fixture {
    let pool = DatabasePool::in_memory().await.expect("in-memory database");
    let repositories = pool.repositories();
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = Arc::new(CacheStore::new(repositories.cache.clone(), clock.clone()));
    let recorder = JobRecorder::from_repositories(&repositories, clock.clone());
    let job = RefreshJob::new(cache.clone(), recorder);
    Fixture {
        job,
        cache,
        clock,
        repositories,
    }
}

fn key(k: &str) -> CacheKey {
    CacheKey::new(k).unwrap()
}

#[tokio::test]
async fn test_refresh_reports_cleaned_and_invalidated() {
    let f = fixture().await;
    f.cache.set(&key("metrics:a"), json!(1), Duration::from_secs(10)).await.unwrap();
    f.cache.set(&key("metrics:b"), json!(2), Duration::from_secs(10)).await.unwrap();
    f.cache.set(&key("social:c"), json!(3), Duration::from_secs(3600)).await.unwrap();

    f.clock.advance(ChronoDuration::seconds(10));
    let report = assert_ok!(f.job.refresh().await);

    assert_eq!(
        report,
        RefreshReport {
            cleaned: 2,
            invalidated: 1
        }
    );
    assert_eq!(f.repositories.cache.count().await.unwrap(), 0);

    let runs = f.job.recorder().recent_runs(Some(REFRESH_JOB_NAME), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, JobRunStatus::Success);
    assert_eq!(runs[0].message, "Cleaned 2 expired entries, invalidated 1 entries");

    let state = f.job.recorder().state(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Succeeded);
    assert_eq!(state.run_id, runs[0].id);
    assert!(!state.is_running());
}

#[tokio::test]
async fn test_refresh_twice_is_safe() {
    let f = fixture().await;
    f.cache.set(&key("metrics:a"), json!(1), Duration::from_secs(60)).await.unwrap();

    assert_ok!(f.job.refresh().await);
    f.clock.advance(ChronoDuration::seconds(1));
    let second = assert_ok!(f.job.refresh().await);
    assert_eq!(second, RefreshReport::default());

    let runs = f.job.recorder().recent_runs(None, 10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs[0].started_at >= runs[1].started_at);
}

#[tokio::test]
async fn test_refresh_on_empty_cache() {
    let f = fixture().await;
    let report = assert_ok!(f.job.refresh().await);
    assert_eq!(report, RefreshReport::default());
}

#[tokio::test]
async fn test_execute_returns_summary() {
    let f = fixture().await;
    assert_eq!(f.job.name(), REFRESH_JOB_NAME);
    let summary = f.job.execute().await.unwrap();
    assert_eq!(summary, "Cleaned 0 expired entries, invalidated 0 entries");
}

/// Cache whose cleanup step fails.
#[derive(Debug)]
struct BrokenCleanup;

#[async_trait]
impl CacheService for BrokenCleanup {
    async fn get(&self, _key: &CacheKey) -> PulseResult<Option<JsonValue>> {
        Ok(None)
    }

    async fn lookup(&self, _key: &CacheKey) -> PulseResult<CacheLookup> {
        Ok(CacheLookup::Absent)
    }

    async fn set(&self, _key: &CacheKey, _payload: JsonValue, _ttl: Duration) -> PulseResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _scope: &InvalidationScope) -> PulseResult<u64> {
        Ok(0)
    }

    async fn cleanup_expired(&self) -> PulseResult<u64> {
        Err(PulseError::storage("table is locked"))
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }
}

#[tokio::test]
async fn test_failure_is_recorded_then_returned() {
    let f = fixture().await;
    let recorder = JobRecorder::from_repositories(&f.repositories, f.clock.clone());
    let job = RefreshJob::new(Arc::new(BrokenCleanup), recorder.clone());

    let err = assert_err!(job.refresh().await);
    assert_eq!(err.to_string(), "Storage error: table is locked");

    let runs = recorder.recent_runs(Some(REFRESH_JOB_NAME), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, JobRunStatus::Error);
    assert_eq!(runs[0].message, "Storage error: table is locked");

    let state = recorder.state(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Failed);
}

/// Job-run log that cannot be written.
struct BrokenLog;

#[async_trait]
impl JobRunRepository for BrokenLog {
    async fn append(&self, _log: &JobRunLog) -> PulseResult<()> {
        Err(PulseError::storage("disk full"))
    }

    async fn recent(&self, _job_name: Option<&str>, _limit: u32) -> PulseResult<Vec<JobRunLog>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_log_write_failure_does_not_mask_success() {
    let f = fixture().await;
    f.cache.set(&key("metrics:a"), json!(1), Duration::from_secs(60)).await.unwrap();

    let recorder = JobRecorder::new(Arc::new(BrokenLog), f.repositories.job_states.clone(), f.clock.clone());
    let job = RefreshJob::new(f.cache.clone(), recorder);

    let report = assert_ok!(job.refresh().await);
    assert_eq!(report.invalidated, 1);

    let state = f.repositories.job_states.find(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Succeeded);
    assert_eq!(state.finished_at, Some(f.clock.now()));
}

#[tokio::test]
async fn test_overlapping_runs_keep_the_newer_state() {
    let f = fixture().await;
    let recorder = f.job.recorder();

    let first = recorder.start(REFRESH_JOB_NAME).await;
    f.clock.advance(ChronoDuration::seconds(1));
    let second = recorder.start(REFRESH_JOB_NAME).await;

    f.clock.advance(ChronoDuration::seconds(1));
    recorder.succeed(&first, "first done").await;

    let state = recorder.state(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Running);
    assert_eq!(state.run_id, second.run_id);

    // The older run still gets its log row.
    let runs = recorder.recent_runs(Some(REFRESH_JOB_NAME), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, first.run_id);

    f.clock.advance(ChronoDuration::seconds(1));
    recorder.fail(&second, "Storage error: down").await;

    let state = recorder.state(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Failed);
    assert_eq!(state.run_id, second.run_id);
    assert_eq!(state.message.as_deref(), Some("Storage error: down"));
}

/// Cache whose cleanup works but whose invalidation fails.
#[derive(Debug)]
struct BrokenInvalidate(Arc<CacheStore>);

#[async_trait]
impl CacheService for BrokenInvalidate {
    async fn get(&self, key: &CacheKey) -> PulseResult<Option<JsonValue>> {
        self.0.get(key).await
    }

    async fn lookup(&self, key: &CacheKey) -> PulseResult<CacheLookup> {
        self.0.lookup(key).await
    }

    async fn set(&self, key: &CacheKey, payload: JsonValue, ttl: Duration) -> PulseResult<()> {
        self.0.set(key, payload, ttl).await
    }

    async fn invalidate(&self, _scope: &InvalidationScope) -> PulseResult<u64> {
        Err(PulseError::storage("lock wait timeout"))
    }

    async fn cleanup_expired(&self) -> PulseResult<u64> {
        self.0.cleanup_expired().await
    }

    fn default_ttl(&self) -> Duration {
        self.0.default_ttl()
    }
}

#[tokio::test]
async fn test_cleanup_stays_committed_when_invalidation_fails() {
    let f = fixture().await;
    f.cache.set(&key("metrics:old"), json!(1), Duration::from_secs(10)).await.unwrap();
    f.cache.set(&key("metrics:live"), json!(2), Duration::from_secs(3600)).await.unwrap();
    f.clock.advance(ChronoDuration::seconds(10));

    let recorder = JobRecorder::from_repositories(&f.repositories, f.clock.clone());
    let job = RefreshJob::new(Arc::new(BrokenInvalidate(f.cache.clone())), recorder.clone());

    let err = assert_err!(job.refresh().await);
    assert_eq!(err.to_string(), "Storage error: lock wait timeout");

    assert_eq!(f.repositories.cache.count().await.unwrap(), 1);
    assert_eq!(f.cache.lookup(&key("metrics:old")).await.unwrap(), CacheLookup::Absent);
    assert!(matches!(f.cache.lookup(&key("metrics:live")).await.unwrap(), CacheLookup::Fresh(_)));

    let runs = recorder.recent_runs(Some(REFRESH_JOB_NAME), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, JobRunStatus::Error);
    assert_eq!(runs[0].message, "Storage error: lock wait timeout");

    let state = recorder.state(REFRESH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(state.phase, JobPhase::Failed);
    assert_eq!(state.run_id, runs[0].id);
}
