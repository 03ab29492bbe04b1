//! Application state for Axum handlers.

use pulse_jobs::{JobRecorder, RefreshJob};
use pulse_repository::DatabasePoolInterface;
use pulse_service::CacheService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn CacheService>,
    pub refresh_job: RefreshJob,
    pub database: Arc<dyn DatabasePoolInterface>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        cache: Arc<dyn CacheService>,
        refresh_job: RefreshJob,
        database: Arc<dyn DatabasePoolInterface>,
    ) -> Self {
        Self {
            cache,
            refresh_job,
            database,
        }
    }

    /// Job bookkeeping shared with the refresh job.
    pub fn recorder(&self) -> &JobRecorder {
        self.refresh_job.recorder()
    }
}
