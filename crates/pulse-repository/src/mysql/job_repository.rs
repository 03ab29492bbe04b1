//! MySQL job-run log and job-state repositories.

use crate::parse_run_id;
use crate::traits::{JobRunRepository, JobStateRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{JobRunLog, JobState, PulseError, PulseResult};
use sqlx::mysql::MySqlPool;
use sqlx::FromRow;
use tracing::debug;

/// MySQL job-run log repository.
#[derive(Clone)]
pub struct MySqlJobRunRepository {
    pool: MySqlPool,
}

impl MySqlJobRunRepository {
    /// Creates a new MySQL job-run repository.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobRunRow {
    id: String, // CHAR(36)
    job_name: String,
    status: String,
    message: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TryFrom<JobRunRow> for JobRunLog {
    type Error = PulseError;

    fn try_from(row: JobRunRow) -> Result<Self, Self::Error> {
        Ok(JobRunLog {
            id: parse_run_id(&row.id)?,
            job_name: row.job_name,
            status: row.status.parse()?,
            message: row.message,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

#[async_trait]
impl JobRunRepository for MySqlJobRunRepository {
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
        .bind(run.started_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, job_name: Option<&str>, limit: u32) -> PulseResult<Vec<JobRunLog>> {
        debug!("Listing up to {} job runs (job: {:?})", limit, job_name);

        let rows = sqlx::query_as::<_, JobRunRow>(
            r#"
            SELECT id, job_name, status, message, started_at, finished_at
            FROM job_runs
            WHERE (? IS NULL OR job_name = ?)
            ORDER BY started_at DESC, finished_at DESC
            LIMIT ?
            "#,
        )
        .bind(job_name)
        .bind(job_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRunLog::try_from).collect()
    }
}

/// MySQL job-state repository.
#[derive(Clone)]
pub struct MySqlJobStateRepository {
    pool: MySqlPool,
}

impl MySqlJobStateRepository {
    /// Creates a new MySQL job-state repository.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobStateRow {
    job_name: String,
    phase: String,
    run_id: String,
    message: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobStateRow> for JobState {
    type Error = PulseError;

    fn try_from(row: JobStateRow) -> Result<Self, Self::Error> {
        Ok(JobState {
            job_name: row.job_name,
            phase: row.phase.parse()?,
            run_id: parse_run_id(&row.run_id)?,
            message: row.message,
            started_at: row.started_at,
            finished_at: row.finished_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl JobStateRepository for MySqlJobStateRepository {
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
            ON DUPLICATE KEY UPDATE
                phase = VALUES(phase),
                run_id = VALUES(run_id),
                message = VALUES(message),
                started_at = VALUES(started_at),
                finished_at = VALUES(finished_at),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&state.job_name)
        .bind(state.phase.as_str())
        .bind(state.run_id.to_string())
        .bind(state.message.as_deref())
        .bind(state.started_at)
        .bind(state.finished_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete(&self, state: &JobState) -> PulseResult<bool> {
        debug!("Completing job state {} run {} -> {}", state.job_name, state.run_id, state.phase);

        let updated = sqlx::query(
            r#"
            UPDATE job_states
            SET phase = ?, message = ?, finished_at = ?, updated_at = ?
            WHERE job_name = ? AND run_id = ?
            "#,
        )
        .bind(state.phase.as_str())
        .bind(state.message.as_deref())
        .bind(state.finished_at)
        .bind(state.updated_at)
        .bind(&state.job_name)
        .bind(state.run_id.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        // No row for this run: write one only if the job has no row at all.
        let inserted = sqlx::query(
            r#"
            INSERT IGNORE INTO job_states (job_name, phase, run_id, message, started_at, finished_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&state.job_name)
        .bind(state.phase.as_str())
        .bind(state.run_id.to_string())
        .bind(state.message.as_deref())
        .bind(state.started_at)
        .bind(state.finished_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
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
