//! Database connection pool management.

use crate::mysql::{MySqlCacheRepository, MySqlJobRunRepository, MySqlJobStateRepository};
use crate::sqlite::{SqliteCacheRepository, SqliteJobRunRepository, SqliteJobStateRepository};
use crate::traits::{CacheRepository, JobRunRepository, JobStateRepository};
use async_trait::async_trait;
use pulse_config::DatabaseConfig;
use pulse_core::{PulseError, PulseResult};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Storage backend, chosen from the database URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// `mysql://`
    MySql,
    /// `sqlite:`
    Sqlite,
}

impl DatabaseBackend {
    /// Picks the backend for a database URL.
    pub fn from_url(url: &str) -> PulseResult<Self> {
        if url.starts_with("mysql://") {
            Ok(Self::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(PulseError::Configuration(
                "Database URL must start with mysql:// or sqlite:".to_string(),
            ))
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Interface for database pool operations.
#[async_trait]
pub trait DatabasePoolInterface: Send + Sync {
    /// Returns the backend behind this pool.
    fn backend(&self) -> DatabaseBackend;

    /// Checks if the database connection is healthy.
    async fn health_check(&self) -> PulseResult<()>;

    /// Runs database migrations.
    async fn run_migrations(&self) -> PulseResult<()>;

    /// Closes the database pool.
    async fn close(&self);
}

/// Database pool wrapper.
#[derive(Clone)]
pub enum DatabasePool {
    /// Shared MySQL database.
    MySql(MySqlPool),
    /// Local SQLite database.
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Creates a new database pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> PulseResult<Self> {
        match DatabaseBackend::from_url(&config.url)? {
            DatabaseBackend::MySql => Self::connect_mysql(config).await,
            DatabaseBackend::Sqlite => Self::connect_sqlite(config).await,
        }
    }

    async fn connect_mysql(config: &DatabaseConfig) -> PulseResult<Self> {
        info!("Connecting to MySQL database...");

        let pool = MySqlPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(&config.url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                PulseError::storage(format!("Failed to connect: {}", e))
            })?;

        info!("MySQL connection pool established");
        Ok(Self::MySql(pool))
    }

    async fn connect_sqlite(config: &DatabaseConfig) -> PulseResult<Self> {
        info!("Opening SQLite database...");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| PulseError::Configuration(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its one connection.
        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .min_connections(config.min_connections)
                .max_connections(config.max_connections)
                .idle_timeout(Some(config.idle_timeout()))
        };

        let pool = pool_options
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!("Failed to open database: {}", e);
                PulseError::storage(format!("Failed to connect: {}", e))
            })?;

        info!("SQLite connection pool established");
        Ok(Self::Sqlite(pool))
    }

    /// Opens a private in-memory SQLite database with migrations applied.
    pub async fn in_memory() -> PulseResult<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        };
        let pool = Self::new(&config).await?;
        pool.run_migrations().await?;
        Ok(pool)
    }

    /// Builds the repositories backed by this pool.
    #[must_use]
    pub fn repositories(&self) -> Repositories {
        match self {
            Self::MySql(pool) => Repositories {
                cache: Arc::new(MySqlCacheRepository::new(pool.clone())),
                job_runs: Arc::new(MySqlJobRunRepository::new(pool.clone())),
                job_states: Arc::new(MySqlJobStateRepository::new(pool.clone())),
            },
            Self::Sqlite(pool) => Repositories {
                cache: Arc::new(SqliteCacheRepository::new(pool.clone())),
                job_runs: Arc::new(SqliteJobRunRepository::new(pool.clone())),
                job_states: Arc::new(SqliteJobStateRepository::new(pool.clone())),
            },
        }
    }
}

#[async_trait]
impl DatabasePoolInterface for DatabasePool {
    fn backend(&self) -> DatabaseBackend {
        match self {
            Self::MySql(_) => DatabaseBackend::MySql,
            Self::Sqlite(_) => DatabaseBackend::Sqlite,
        }
    }

    async fn health_check(&self) -> PulseResult<()> {
        let result = match self {
            Self::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Self::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        result.map_err(|e| PulseError::storage(format!("Health check failed: {}", e)))
    }

    async fn run_migrations(&self) -> PulseResult<()> {
        info!("Running {} database migrations...", self.backend());
        match self {
            Self::MySql(pool) => sqlx::migrate!("../../migrations/mysql").run(pool).await?,
            Self::Sqlite(pool) => sqlx::migrate!("../../migrations/sqlite").run(pool).await?,
        }
        info!("Database migrations completed");
        Ok(())
    }

    async fn close(&self) {
        info!("Closing database connection pool...");
        match self {
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
        info!("Database connection pool closed");
    }
}

impl fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (size, num_idle) = match self {
            Self::MySql(pool) => (pool.size(), pool.num_idle()),
            Self::Sqlite(pool) => (pool.size(), pool.num_idle()),
        };
        f.debug_struct("DatabasePool")
            .field("backend", &self.backend())
            .field("size", &size)
            .field("num_idle", &num_idle)
            .finish()
    }
}

/// The repositories sharing one pool.
#[derive(Clone)]
pub struct Repositories {
    /// Cache entries.
    pub cache: Arc<dyn CacheRepository>,
    /// Job-run log.
    pub job_runs: Arc<dyn JobRunRepository>,
    /// Job state records.
    pub job_states: Arc<dyn JobStateRepository>,
}
