//! Webhook processing configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Tuning for the ingestion pipeline and the stale-event reconciler
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// How long an activation waits on a per-order lock, in milliseconds
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Age after which an in-flight claim is considered abandoned, in seconds
    #[serde(default = "default_stale_grace")]
    pub stale_grace_secs: u64,

    /// How often the reconciler sweeps for stale claims, in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Maximum stale events re-driven per sweep
    #[serde(default = "default_reconcile_batch_limit")]
    pub reconcile_batch_limit: u32,
}

impl ProcessingConfig {
    /// Validate processing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lock_wait_ms == 0
            || self.stale_grace_secs == 0
            || self.reconcile_interval_secs == 0
            || self.reconcile_batch_limit == 0
        {
            return Err(ValidationError::InvalidProcessingInterval);
        }
        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            lock_wait_ms: default_lock_wait_ms(),
            stale_grace_secs: default_stale_grace(),
            reconcile_interval_secs: default_reconcile_interval(),
            reconcile_batch_limit: default_reconcile_batch_limit(),
        }
    }
}

fn default_lock_wait_ms() -> u64 {
    3000
}

fn default_stale_grace() -> u64 {
    300
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_reconcile_batch_limit() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessingConfig::default();
        assert_eq!(config.lock_wait_ms, 3000);
        assert_eq!(config.stale_grace_secs, 300);
        assert_eq!(config.reconcile_interval_secs, 60);
        assert_eq!(config.reconcile_batch_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let config = ProcessingConfig {
            reconcile_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_lock_wait() {
        let config = ProcessingConfig {
            lock_wait_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
