//! # Pulse Config
//!
//! Configuration management for Pulse.
//! Supports layered configuration from files, environment variables,
//! and runtime reload.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
