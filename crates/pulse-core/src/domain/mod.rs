//! Domain model of the aggregate cache and its maintenance jobs.

mod cache_entry;
mod cache_key;
mod invalidation;
mod job_run;
mod job_state;

pub use cache_entry::*;
pub use cache_key::*;
pub use invalidation::*;
pub use job_run::*;
pub use job_state::*;
