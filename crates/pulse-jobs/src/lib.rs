//! # Pulse Jobs
//!
//! The cache refresh job and the machinery around it:
//!
//! - [`RefreshJob`]: cleans expired entries, then invalidates everything
//! - [`JobRecorder`]: writes the job-run log row and the job-state record
//!   for every run, whatever its outcome
//! - [`Scheduler`]: in-process cron trigger with graceful shutdown
//!
//! Every transport (HTTP, CLI, schedule) calls the same [`RefreshJob::refresh`].

pub mod error;
pub mod job;
pub mod metrics;
pub mod recorder;
pub mod refresh;
pub mod scheduler;

pub use error::*;
pub use job::*;
pub use recorder::*;
pub use refresh::*;
pub use scheduler::*;
