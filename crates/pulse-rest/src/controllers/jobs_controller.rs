//! Job history controller.

use crate::responses::{ok, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use pulse_core::{JobRunLog, JobState, PulseError};
use pulse_jobs::MAX_RECENT_RUNS;
use serde::Deserialize;
use utoipa::IntoParams;

/// Rows returned when no limit is given.
pub const DEFAULT_RUNS_LIMIT: u32 = 20;

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/runs", get(list_runs))
        .route("/states", get(list_states))
        .route("/:name/state", get(get_state))
}

/// Query parameters for the run history.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RunsParams {
    /// Only runs of this job.
    pub job_name: Option<String>,
    /// Maximum rows, 1 to 200. Defaults to 20.
    pub limit: Option<u32>,
}

impl RunsParams {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_RUNS_LIMIT).clamp(1, MAX_RECENT_RUNS)
    }
}

/// Recent job runs, newest first.
#[utoipa::path(
    get,
    path = "/jobs/runs",
    tag = "jobs",
    security(("bearer_auth" = [])),
    params(RunsParams),
    responses(
        (status = 200, description = "Job-run log rows", body = Vec<JobRunLog>),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn list_runs(State(state): State<AppState>, Query(params): Query<RunsParams>) -> ApiResult<Vec<JobRunLog>> {
    let runs = state
        .recorder()
        .recent_runs(params.job_name.as_deref(), params.limit())
        .await?;
    ok(runs)
}

/// Latest state of every job that has run.
#[utoipa::path(
    get,
    path = "/jobs/states",
    tag = "jobs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Job states ordered by name", body = Vec<JobState>),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn list_states(State(state): State<AppState>) -> ApiResult<Vec<JobState>> {
    ok(state.recorder().states().await?)
}

/// Latest state of one job.
#[utoipa::path(
    get,
    path = "/jobs/{name}/state",
    tag = "jobs",
    security(("bearer_auth" = [])),
    params(("name" = String, Path, description = "Job name")),
    responses(
        (status = 200, description = "Job state", body = JobState),
        (status = 404, description = "Job has never run")
    )
)]
pub async fn get_state(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<JobState> {
    let job_state = state
        .recorder()
        .state(&name)
        .await?
        .ok_or_else(|| PulseError::not_found("JobState", &name))?;
    ok(job_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_bounds() {
        let params = |limit| RunsParams { job_name: None, limit };
        assert_eq!(params(None).limit(), 20);
        assert_eq!(params(Some(0)).limit(), 1);
        assert_eq!(params(Some(50)).limit(), 50);
        assert_eq!(params(Some(10_000)).limit(), 200);
    }
}
