//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use pulse_config::DEFAULT_CONFIG_DIR;
use pulse_core::{InvalidationMode, InvalidationScope, PulseResult};
use std::path::PathBuf;

/// Pulse aggregate cache server and maintenance tool.
#[derive(Debug, Parser)]
#[command(name = "pulse-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml, {environment}.toml and local.toml.
    #[arg(long, global = true, env = "PULSE_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to run. `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server and, when enabled, the refresh schedule (default)
    Serve,

    /// Run the refresh job once and print its report
    Refresh,

    /// Delete expired cache entries and print the count
    Cleanup,

    /// Delete cache entries in a scope and print the count
    Invalidate(InvalidateArgs),

    /// Apply database migrations and exit
    Migrate,
}

/// Arguments of `invalidate`.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct InvalidateArgs {
    /// exact, prefix or all
    #[arg(long, value_parser = parse_mode)]
    pub mode: InvalidationMode,

    /// Key for exact, prefix for prefix
    #[arg(long)]
    pub key: Option<String>,
}

impl InvalidateArgs {
    /// Validates the arguments into a scope.
    pub fn scope(&self) -> PulseResult<InvalidationScope> {
        InvalidationScope::from_parts(self.mode, self.key.clone())
    }
}

fn parse_mode(value: &str) -> Result<InvalidationMode, String> {
    value.parse().map_err(|e: pulse_core::PulseError| e.to_string())
}
