//! # Pulse Repository
//!
//! Durable storage for the aggregate cache, the job-run log and the job
//! state record.
//!
//! ```text
//! Service / Jobs
//!   ↓  Arc<dyn CacheRepository>, Arc<dyn JobRunRepository>, Arc<dyn JobStateRepository>
//! MySql*Repository | Sqlite*Repository
//!   ↓
//! MySQL (shared deployments) | SQLite (single node, tests)
//! ```
//!
//! Every operation is a single SQL statement on a pooled connection. Matching
//! for invalidation uses bound parameters only; callers never pass pattern
//! syntax through to the database.

pub mod mysql;
pub mod pool;
pub mod sqlite;
pub mod traits;

pub use mysql::*;
pub use pool::*;
pub use sqlite::*;
pub use traits::*;

use pulse_core::{PulseError, PulseResult, RunId};

/// Parses a run id read back from storage.
pub(crate) fn parse_run_id(raw: &str) -> PulseResult<RunId> {
    RunId::parse(raw).map_err(|e| PulseError::internal(format!("Invalid UUID in database: {}", e)))
}
