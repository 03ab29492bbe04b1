//! # Pulse Server
//!
//! Entry point for the aggregate cache service. Without a subcommand it
//! serves HTTP; `refresh`, `cleanup`, `invalidate` and `migrate` run once,
//! print a JSON result to stdout and exit.

use anyhow::Context;
use clap::Parser;
use pulse_config::{AppConfig, ConfigLoader};
use pulse_repository::{DatabasePool, DatabasePoolInterface};
use pulse_server::app::App;
use pulse_server::cli::{Cli, Command};
use pulse_server::startup::print_banner;
use pulse_server::telemetry::init_logging;
use serde::Serialize;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::new(&cli.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", cli.config_dir.display()))?;
    let config = loader.get().await;

    init_logging(&config.observability).context("Failed to initialize logging")?;

    let result = run(cli.command(), config).await;
    if let Err(e) = &result {
        error!("Application error: {:#}", e);
    }
    result
}

async fn run(command: Command, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Serve => {
            print_banner();
            info!("Environment: {}", config.app.environment);
            let app = App::build(config).await?;
            app.serve(shutdown_signal()).await?;
        }
        Command::Refresh => {
            let app = App::build(config).await?;
            let report = app.refresh().await;
            app.pool().close().await;
            print_json(&report?)?;
        }
        Command::Cleanup => {
            let app = App::build(config).await?;
            let report = app.cleanup().await;
            app.pool().close().await;
            print_json(&report?)?;
        }
        Command::Invalidate(args) => {
            let scope = args.scope()?;
            let app = App::build(config).await?;
            let report = app.invalidate(&scope).await;
            app.pool().close().await;
            print_json(&report?)?;
        }
        Command::Migrate => {
            let pool = DatabasePool::new(&config.database).await?;
            let migrated = pool.run_migrations().await;
            pool.close().await;
            migrated?;
            print_json(&serde_json::json!({ "migrated": true, "backend": pool.backend().to_string() }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
