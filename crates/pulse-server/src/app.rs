//! Application wiring shared by the server and the one-shot commands.

use crate::startup::print_startup_info;
use crate::telemetry::{init_metrics, metrics_router};
use pulse_config::AppConfig;
use pulse_core::{Clock, InvalidationScope, PulseError, PulseResult, SystemClock};
use pulse_jobs::{JobRecorder, RefreshJob, RefreshReport, Scheduler, REFRESH_JOB_NAME};
use pulse_repository::{DatabasePool, DatabasePoolInterface};
use pulse_rest::middleware::AuthMiddlewareState;
use pulse_rest::{create_router, AppState};
use pulse_service::{CacheService, CacheStore};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Result of `cleanup` and `invalidate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovedReport {
    pub removed: u64,
}

/// The assembled service graph.
pub struct App {
    config: AppConfig,
    pool: DatabasePool,
    cache: Arc<dyn CacheService>,
    refresh_job: RefreshJob,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Connects to the configured database and builds the services.
    ///
    /// Migrations run first when `database.run_migrations` is set.
    pub async fn build(config: AppConfig) -> PulseResult<Self> {
        let pool = DatabasePool::new(&config.database).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }
        Ok(Self::with_pool(config, pool, Arc::new(SystemClock)))
    }

    /// Builds the services over an existing pool.
    pub fn with_pool(config: AppConfig, pool: DatabasePool, clock: Arc<dyn Clock>) -> Self {
        let repositories = pool.repositories();
        let cache: Arc<dyn CacheService> = Arc::new(CacheStore::with_ttl(
            repositories.cache.clone(),
            clock.clone(),
            config.cache.default_ttl(),
        ));
        let recorder = JobRecorder::from_repositories(&repositories, clock.clone());
        let refresh_job = RefreshJob::new(cache.clone(), recorder);

        Self {
            config,
            pool,
            cache,
            refresh_job,
            clock,
        }
    }

    /// Runs the refresh job once.
    pub async fn refresh(&self) -> PulseResult<RefreshReport> {
        Ok(self.refresh_job.refresh().await?)
    }

    /// Deletes expired entries.
    pub async fn cleanup(&self) -> PulseResult<RemovedReport> {
        let removed = self.cache.cleanup_expired().await?;
        Ok(RemovedReport { removed })
    }

    /// Deletes every entry in `scope`.
    pub async fn invalidate(&self, scope: &InvalidationScope) -> PulseResult<RemovedReport> {
        let removed = self.cache.invalidate(scope).await?;
        Ok(RemovedReport { removed })
    }

    /// Serves HTTP until `shutdown` resolves, running the refresh schedule
    /// alongside when it is enabled.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> PulseResult<()> {
        let scheduler = self.build_scheduler()?;

        let state = AppState::new(
            self.cache.clone(),
            self.refresh_job.clone(),
            Arc::new(self.pool.clone()),
        );
        let auth = AuthMiddlewareState::new(self.config.security.secret());
        let mut router = create_router(state, &self.config.server, auth);

        let observability = &self.config.observability;
        if let Some(handle) = init_metrics(observability) {
            router = router.merge(metrics_router(&observability.metrics_path, handle));
        }

        let addr = self.config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| PulseError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        print_startup_info(&addr, observability.metrics_enabled.then_some(observability.metrics_path.as_str()));

        let scheduler = scheduler.map(|scheduler| {
            let handle = tokio::spawn({
                let scheduler = scheduler.clone();
                async move { scheduler.start().await }
            });
            (scheduler, handle)
        });

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| PulseError::Internal(format!("HTTP server error: {}", e)));

        if let Some((scheduler, handle)) = scheduler {
            scheduler.stop();
            match handle.await {
                Ok(Err(e)) => error!(error = %e, "Scheduler exited with an error"),
                Err(e) => error!(error = %e, "Scheduler task panicked"),
                Ok(Ok(())) => {}
            }
        }

        self.pool.close().await;
        info!("Server shutdown complete");
        served
    }

    fn build_scheduler(&self) -> PulseResult<Option<Arc<Scheduler>>> {
        let refresh = &self.config.refresh;
        if !refresh.enabled {
            info!("Scheduled refresh disabled");
            return Ok(None);
        }

        let scheduler = Arc::new(Scheduler::new(self.clock.clone(), refresh.poll_interval()));
        scheduler.schedule(REFRESH_JOB_NAME, &refresh.schedule, Arc::new(self.refresh_job.clone()))?;
        Ok(Some(scheduler))
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The database pool.
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}
