//! # Pulse Core
//!
//! Core types, domain model, and error definitions shared by every Pulse
//! crate: the cache entry and its key, invalidation scopes, the job-run log
//! and job-state records, and the clock that decides expiry.

pub mod clock;
pub mod domain;
pub mod error;
pub mod id;
pub mod result;

pub use clock::*;
pub use domain::*;
pub use error::*;
pub use id::*;
pub use result::*;
