//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Enable the replay-storm test harness (never in production!)
    #[serde(default)]
    pub replay_storm_enabled: bool,

    /// Run the periodic stale-claim reconciler
    #[serde(default = "default_reconciler_enabled")]
    pub reconciler_enabled: bool,

    /// Show detailed error messages (disable in production!)
    #[serde(default)]
    pub verbose_errors: bool,

    /// Order IDs with this prefix are treated as synthetic test orders
    #[serde(default = "default_test_order_prefix")]
    pub test_order_prefix: String,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            replay_storm_enabled: false,
            reconciler_enabled: default_reconciler_enabled(),
            verbose_errors: false,
            test_order_prefix: default_test_order_prefix(),
        }
    }
}

fn default_reconciler_enabled() -> bool {
    true
}

fn default_test_order_prefix() -> String {
    "TEST-".to_string()
}
