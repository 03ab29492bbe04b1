//! Cache maintenance controller.

use crate::responses::{ok, ApiResult, RemovedResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pulse_core::{CacheEntry, CacheKey, InvalidationMode, InvalidationScope, PulseError};
use pulse_jobs::RefreshReport;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

/// Creates the cache router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/refresh", get(refresh_cache).post(refresh_cache))
        .route("/cleanup", post(cleanup_expired))
        .route("/invalidate", post(invalidate))
        .route("/entries/*key", get(get_entry))
}

/// Invalidation request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InvalidateRequest {
    /// Which entries to delete.
    pub mode: InvalidationMode,
    /// Key or prefix. Required unless `mode` is `all`.
    #[serde(default)]
    pub key: Option<String>,
}

/// Runs the refresh job.
#[utoipa::path(
    post,
    path = "/cache/refresh",
    tag = "cache",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Refresh completed", body = RefreshReport),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Refresh failed; the failure is in the job-run log")
    )
)]
pub async fn refresh_cache(State(state): State<AppState>) -> ApiResult<RefreshReport> {
    let report = state.refresh_job.refresh().await?;
    ok(report)
}

/// Deletes expired entries.
#[utoipa::path(
    post,
    path = "/cache/cleanup",
    tag = "cache",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Expired entries removed", body = RemovedResponse),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn cleanup_expired(State(state): State<AppState>) -> ApiResult<RemovedResponse> {
    let removed = state.cache.cleanup_expired().await?;
    ok(RemovedResponse { removed })
}

/// Deletes entries in a scope regardless of expiry.
#[utoipa::path(
    post,
    path = "/cache/invalidate",
    tag = "cache",
    security(("bearer_auth" = [])),
    request_body = InvalidateRequest,
    responses(
        (status = 200, description = "Entries removed", body = RemovedResponse),
        (status = 400, description = "Key missing for exact or prefix mode"),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn invalidate(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> ApiResult<RemovedResponse> {
    let scope = InvalidationScope::from_parts(request.mode, request.key)?;
    let removed = state.cache.invalidate(&scope).await?;
    info!(scope = %scope, removed, "Invalidated cache entries");
    ok(RemovedResponse { removed })
}

/// Returns a fresh entry.
#[utoipa::path(
    get,
    path = "/cache/entries/{key}",
    tag = "cache",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Cache key")),
    responses(
        (status = 200, description = "Entry is fresh", body = CacheEntry),
        (status = 400, description = "Invalid cache key"),
        (status = 404, description = "Entry is absent or expired")
    )
)]
pub async fn get_entry(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<CacheEntry> {
    let key = CacheKey::new(key)?;
    let entry = state
        .cache
        .lookup(&key)
        .await?
        .fresh()
        .ok_or_else(|| PulseError::not_found("CacheEntry", &key))?;
    ok(entry)
}
