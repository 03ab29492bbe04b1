//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File, FileFormat};
use pulse_core::{PulseError, PulseResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Environment variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "PULSE_ENVIRONMENT";

/// Prefix for environment variable overrides, e.g. `PULSE__SERVER__PORT`.
pub const ENV_PREFIX: &str = "PULSE";

/// Default configuration directory.
pub const DEFAULT_CONFIG_DIR: &str = "./config";

/// Configuration loader with runtime reload support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{dir}/default.toml`
    /// 2. `{dir}/{environment}.toml`, environment from `PULSE_ENVIRONMENT`
    /// 3. `{dir}/local.toml`, not committed to version control
    /// 4. Environment variables with the `PULSE__` prefix
    pub fn new(config_dir: impl Into<PathBuf>) -> PulseResult<Self> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> PulseResult<Self> {
        Self::new(DEFAULT_CONFIG_DIR)
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration stays in place if the new one is invalid.
    pub async fn reload(&self) -> PulseResult<()> {
        let new_config = Self::load_config(&self.config_dir)?;
        *self.config.write().await = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Gets a specific configuration value by dotted key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }

    fn load_config(config_dir: &Path) -> PulseResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::load_for_environment(config_dir, &environment)
    }

    /// Loads and validates configuration for an explicit environment name.
    pub fn load_for_environment(config_dir: &Path, environment: &str) -> PulseResult<AppConfig> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder()
            .set_override("app.environment", environment)
            .map_err(config_error)?;

        for name in ["default", environment, "local"] {
            let path = config_dir.join(format!("{}.toml", name));
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    fn validate_config(config: &AppConfig) -> PulseResult<()> {
        ConfigValidator::validate(config).map_err(|errors| {
            let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            PulseError::Configuration(joined)
        })?;

        if config.security.secret().is_none() {
            warn!("security.refresh_secret is not set; maintenance endpoints are unauthenticated");
        }

        Ok(())
    }
}

fn config_error(err: ConfigError) -> PulseError {
    PulseError::Configuration(err.to_string())
}
