//! # Pulse Service
//!
//! The cache store: TTL semantics over the cache repository, typed JSON
//! helpers, a compute-through helper, and key builders for the dashboard's
//! aggregates.

pub mod cache;
pub mod metrics;

pub use cache::*;
