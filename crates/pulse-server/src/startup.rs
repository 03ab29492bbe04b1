//! Server startup output.

use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
    ____        __
   / __ \__  __/ /_______
  / /_/ / / / / / ___/ _ \
 / ____/ /_/ / (__  )  __/
/_/    \__,_/_/____/\___/

      aggregate cache
    "#);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
}

/// Prints where the server can be reached.
pub fn print_startup_info(addr: &str, metrics_path: Option<&str>) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("REST API:  http://{}/api/v1", addr);
    info!("Health:    http://{}/health", addr);
    info!("API Docs:  http://{}/api-docs/openapi.json", addr);
    if let Some(path) = metrics_path {
        info!("Metrics:   http://{}{}", addr, path);
    }
    info!("{}", separator);
}
