//! Configuration validation module.
//!
//! Checks every section up front and reports all problems at once, so a bad
//! deployment fails at startup instead of on the first request.

use crate::AppConfig;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Duration value must be positive.
    NonPositiveDuration { name: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
    /// Metrics path must be absolute.
    InvalidMetricsPath { value: String },
    /// Cron expression does not parse.
    InvalidSchedule { value: String, message: String },
    /// Production deployments must protect the maintenance endpoints.
    MissingRefreshSecret,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
            Self::InvalidMetricsPath { value } => {
                write!(f, "Metrics path must start with '/': '{}'", value)
            }
            Self::InvalidSchedule { value, message } => {
                write!(f, "Invalid refresh schedule '{}': {}", value, message)
            }
            Self::MissingRefreshSecret => {
                write!(f, "security.refresh_secret is required in production")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_server(&config.server, &mut result);
        Self::validate_database(&config.database, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_refresh(&config.refresh, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        if config.app.is_production() && config.security.secret().is_none() {
            result.add_error(ConfigValidationError::MissingRefreshSecret);
        }

        result.into_result()
    }

    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "server.request_timeout_secs".to_string(),
            });
        }

        for origin in config.cors_origins.iter().filter(|o| o.as_str() != "*") {
            if Url::parse(origin).is_err() {
                result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "CORS origin".to_string(),
                    message: format!("Invalid URL format: {}", origin),
                });
            }
        }
    }

    fn validate_database(config: &crate::DatabaseConfig, result: &mut ValidationResult) {
        if config.url.is_empty() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !config.url.starts_with("mysql://") && !config.url.starts_with("sqlite:") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql:// or sqlite:".to_string(),
            });
        }

        if config.min_connections > config.max_connections {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "database.connect_timeout_secs".to_string(),
            });
        }
        if config.idle_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "database.idle_timeout_secs".to_string(),
            });
        }
    }

    fn validate_cache(config: &crate::CacheConfig, result: &mut ValidationResult) {
        if config.default_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "cache.default_ttl_secs".to_string(),
            });
        }
    }

    fn validate_refresh(config: &crate::RefreshConfig, result: &mut ValidationResult) {
        if let Err(e) = cron::Schedule::from_str(&config.schedule) {
            result.add_error(ConfigValidationError::InvalidSchedule {
                value: config.schedule.clone(),
                message: e.to_string(),
            });
        }

        if config.poll_interval_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "refresh.poll_interval_secs".to_string(),
            });
        }
    }

    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        let format = config.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }

        if config.metrics_enabled && !config.metrics_path.starts_with('/') {
            result.add_error(ConfigValidationError::InvalidMetricsPath {
                value: config.metrics_path.clone(),
            });
        }
    }
}
