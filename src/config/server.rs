//! HTTP listener configuration
//!
//! One listener serves three very different surfaces: the gateway
//! webhook endpoint, the operator/order API, and the websocket upgrade
//! path. The request timeout is sized for the webhook surface, where
//! the gateway gives up and redelivers after its own deadline anyway.

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment; gates the replay-storm harness
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Tracing filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request deadline in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// CORS allowed origins, comma-separated; permissive when unset
    pub cors_origins: Option<String>,
}

/// Deployment environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl ServerConfig {
    /// Address to bind the listener to
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// CORS origins split out of the comma-separated setting
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .as_ref()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default()
    }

    /// Validate server configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::MissingRequired("SERVER_HOST"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        // Past two minutes the gateway has long since timed out and
        // redelivered; holding the connection open only ties up a worker.
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_log_level() -> String {
    "info,enroll_gate=debug,sqlx=warn".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
