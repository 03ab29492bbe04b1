//! SQLite job-run log and job-state repositories.

use super::{from_millis, to_millis};
use crate::parse_run_id;
use crate::traits::{JobRunRepository, JobStateRepository};
use async_trait::async_trait;
use pulse_core::{JobRunLog, JobState, PulseError, PulseResult};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use tracing::debug;

/// SQLite job-run log repository.
#[derive(Clone)]
pub struct SqliteJobRunRepository {
    pool: SqlitePool,
}

impl SqliteJobRunRepository {
    /// Creates a new SQLite job-run repository.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobRunRow {
    id: String,
    job_name: String,
    status: String,
    message: String,
    started_at: i64,
    finished_at: i64,
}

impl TryFrom<JobRunRow> for JobRunLog {
    type Error = PulseError;

    fn try_from(row: JobRunRow) -> Result<Self, Self::Error> {
        Ok(JobRunLog {
            id: parse_run_id(&row.id)?,
            job_name: row.job_name,
            status: row.status.parse()?,
            message: row.message,
            started_at: from_millis(row.started_at)?,
            finished_at: from_millis(row.finished_at)?,
        })
    }
}

#[async_trait]
impl JobRunRepository for SqliteJobRunRepository {
    async fn append(&self, run: &JobRunLog) -> PulseResult<()> {
        debug!("Appending job run {} for {}", run.id, run.job_name);

        sqlx::query(
            r#"
            INSERT INTO job_runs (id, job_name, status, message, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.id.to_string())
        .bind(&run.job_name)
        .bind(run.status.as_str())
        .bind(&run.message)
        .bind(to_millis(run.started_at))
        .bind(to_millis(run.finished_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, job_name: Option<&str>, limit: u32) -> PulseResult<Vec<JobRunLog>> {
        debug!("Listing up to {} job runs (job: {:?})", limit, job_name);

        // rowid breaks ties between runs started in the same millisecond.
        let rows = sqlx::query_as::<_, JobRunRow>(
            r#"
            SELECT id, job_name, status, message, started_at, finished_at
            FROM job_runs
            WHERE (?1 IS NULL OR job_name = ?1)
            ORDER BY started_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(job_name)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRunLog::try_from).collect()
    }
}

/// SQLite job-state repository.
#[derive(Clone)]
pub struct SqliteJobStateRepository {
    pool: SqlitePool,
}

impl SqliteJobStateRepository {
    /// Creates a new SQLite job-state repository.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobStateRow {
    job_name: String,
    phase: String,
    run_id: String,
    message: Option<String>,
    started_at: i64,
    finished_at: Option<i64>,
    updated_at: i64,
}

impl TryFrom<JobStateRow> for JobState {
    type Error = PulseError;

    fn try_from(row: JobStateRow) -> Result<Self, Self::Error> {
        Ok(JobState {
            job_name: row.job_name,
            phase: row.phase.parse()?,
            run_id: parse_run_id(&row.run_id)?,
            message: row.message,
            started_at: from_millis(row.started_at)?,
            finished_at: row.finished_at.map(from_millis).transpose()?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[async_trait]
impl JobStateRepository for SqliteJobStateRepository {
    async fn find(&self, job_name: &str) -> PulseResult<Option<JobState>> {
        let row = sqlx::query_as::<_, JobStateRow>(
            r#"
            SELECT job_name, phase, run_id, message, started_at, finished_at, updated_at
            FROM job_states
            WHERE job_name = ?
            "#,
        )
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobState::try_from).transpose()
    }

    async fn save(&self, state: &JobState) -> PulseResult<()> {
        debug!("Saving job state {} -> {}", state.job_name, state.phase);

        sqlx::query(
            r#"
            INSERT INTO job_states (job_name, phase, run_id, message, started_at, finished_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_name) DO UPDATE SET
                phase = excluded.phase,
                run_id = excluded.run_id,
                message = excluded.message,
                started_at = excluded.started_at,
                finished_at = excluded.finished_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.job_name)
        .bind(state.phase.as_str())
        .bind(state.run_id.to_string())
        .bind(state.message.as_deref())
        .bind(to_millis(state.started_at))
        .bind(state.finished_at.map(to_millis))
        .bind(to_millis(state.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete(&self, state: &JobState) -> PulseResult<bool> {
        debug!("Completing job state {} run {} -> {}", state.job_name, state.run_id, state.phase);

        let result = sqlx::query(
            r#"
            INSERT INTO job_states (job_name, phase, run_id, message, started_at, finished_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_name) DO UPDATE SET
                phase = excluded.phase,
                message = excluded.message,
                finished_at = excluded.finished_at,
                updated_at = excluded.updated_at
            WHERE job_states.run_id = excluded.run_id
            "#,
        )
        .bind(&state.job_name)
        .bind(state.phase.as_str())
        .bind(state.run_id.to_string())
        .bind(state.message.as_deref())
        .bind(to_millis(state.started_at))
        .bind(state.finished_at.map(to_millis))
        .bind(to_millis(state.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> PulseResult<Vec<JobState>> {
        let rows = sqlx::query_as::<_, JobStateRow>(
            r#"
            SELECT job_name, phase, run_id, message, started_at, finished_at, updated_at
            FROM job_states
            ORDER BY job_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobState::try_from).collect()
    }
}
