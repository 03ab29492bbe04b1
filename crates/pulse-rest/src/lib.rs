//! # Pulse REST
//!
//! HTTP surface of the aggregate cache: the refresh trigger, cache
//! maintenance endpoints, job-run history and health checks.

pub mod controllers;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
