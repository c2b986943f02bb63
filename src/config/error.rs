//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid connection pool bounds")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (50)")]
    PoolSizeTooLarge,

    #[error("Invalid gateway webhook secret format")]
    InvalidWebhookSecret,

    #[error("Invalid signature timestamp window")]
    InvalidSignatureWindow,

    #[error("Amount tolerance must not be negative")]
    InvalidAmountTolerance,

    #[error("Processing intervals must be greater than zero")]
    InvalidProcessingInterval,

    #[error("Replay storm must not be enabled in production")]
    ReplayStormInProduction,
}
