//! Durable aggregate cache.
//!
//! [`CacheService`] is the dyn-compatible surface the jobs and transports
//! hold; [`CacheExt`] adds typed helpers on top of any implementation.

mod cache_ext;
pub mod cache_keys;
mod cache_service;
mod cache_store;

pub use cache_ext::CacheExt;
pub use cache_service::CacheService;
pub use cache_store::{CacheStore, DEFAULT_TTL};
