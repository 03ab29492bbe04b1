//! # Pulse Server Library
//!
//! Wiring for the `pulse-server` binary: command-line parsing, logging and
//! metrics setup, and the application that the HTTP server, the scheduler
//! and the one-shot maintenance commands share.

pub mod app;
pub mod cli;
pub mod startup;
pub mod telemetry;
