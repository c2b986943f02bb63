//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENROLL_GATE_` prefix and nested values use underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use enroll_gate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod features;
mod payment;
mod processing;
mod redis;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use payment::PaymentConfig;
pub use processing::ProcessingConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the enrollment gateway.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (pubsub fan-out)
    pub redis: RedisConfig,

    /// Payment gateway configuration (webhook verification)
    pub payment: PaymentConfig,

    /// Ingestion pipeline and reconciler tuning
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ENROLL_GATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENROLL_GATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENROLL_GATE__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ENROLL_GATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - URL formats
    /// - Pool size constraints
    /// - Webhook secret prefix
    /// - Production-specific requirements
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.payment.validate()?;
        self.processing.validate()?;

        // The storm harness hammers the ingestion path with duplicates.
        // It must never run against live gateway traffic.
        if self.is_production() && self.features.replay_storm_enabled {
            return Err(ValidationError::ReplayStormInProduction);
        }

        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set environment variables for testing
    /// Uses double underscores to separate nested config values
    fn set_minimal_env() {
        env::set_var("ENROLL_GATE__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("ENROLL_GATE__REDIS__URL", "redis://localhost:6379");
        env::set_var(
            "ENROLL_GATE__PAYMENT__GATEWAY_WEBHOOK_SECRET",
            "whsec_xxx",
        );
    }

    /// Helper to clear environment variables after testing
    fn clear_env() {
        env::remove_var("ENROLL_GATE__DATABASE__URL");
        env::remove_var("ENROLL_GATE__REDIS__URL");
        env::remove_var("ENROLL_GATE__PAYMENT__GATEWAY_WEBHOOK_SECRET");
        env::remove_var("ENROLL_GATE__SERVER__PORT");
        env::remove_var("ENROLL_GATE__SERVER__ENVIRONMENT");
        env::remove_var("ENROLL_GATE__FEATURES__REPLAY_STORM_ENABLED");
        env::remove_var("ENROLL_GATE__PROCESSING__STALE_GRACE_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_processing_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.processing.stale_grace_secs, 300);
        assert_eq!(config.processing.lock_wait_ms, 3000);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("ENROLL_GATE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_replay_storm_rejected_in_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("ENROLL_GATE__SERVER__ENVIRONMENT", "production");
        env::set_var("ENROLL_GATE__FEATURES__REPLAY_STORM_ENABLED", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ReplayStormInProduction)
        ));
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("ENROLL_GATE__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
