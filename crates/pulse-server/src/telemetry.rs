//! Logging and metrics setup.

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pulse_config::ObservabilityConfig;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the log filter. `RUST_LOG` wins over the configured level.
pub fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},pulse=debug,tower_http=info,sqlx=warn")))
}

/// Installs the global subscriber in `pretty` or `json` format.
pub fn init_logging(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = log_filter(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Installs the Prometheus recorder and describes every Pulse metric.
///
/// Returns `None` when metrics are disabled or the recorder cannot be
/// installed; the server runs either way.
pub fn init_metrics(config: &ObservabilityConfig) -> Option<PrometheusHandle> {
    if !config.metrics_enabled {
        info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            pulse_service::metrics::register_metrics();
            pulse_jobs::metrics::register_metrics();
            metrics::gauge!("pulse_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            info!("Prometheus metrics initialized at {}", config.metrics_path);
            Some(handle)
        }
        Err(e) => {
            error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Router serving the rendered metrics at `path`.
pub fn metrics_router(path: &str, handle: PrometheusHandle) -> Router {
    Router::new().route(path, get(render_metrics)).with_state(handle)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_accepts_configured_level() {
        let filter = log_filter("warn");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = ObservabilityConfig {
            metrics_enabled: false,
            ..ObservabilityConfig::default()
        };
        assert!(init_metrics(&config).is_none());
    }
}
