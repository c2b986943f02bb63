//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration (webhook verification and amount matching)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Gateway webhook signing secret
    pub gateway_webhook_secret: SecretString,

    /// Maximum accepted age of a signed timestamp, in seconds
    #[serde(default = "default_signature_max_age")]
    pub signature_max_age_secs: i64,

    /// Maximum accepted clock skew into the future, in seconds
    #[serde(default = "default_signature_max_skew")]
    pub signature_max_skew_secs: i64,

    /// Underpayment tolerance in minor currency units
    #[serde(default)]
    pub amount_tolerance_minor: i64,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.gateway_webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_WEBHOOK_SECRET"));
        }

        // Verify the secret prefix for safety
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if self.signature_max_age_secs <= 0 || self.signature_max_skew_secs < 0 {
            return Err(ValidationError::InvalidSignatureWindow);
        }
        if self.amount_tolerance_minor < 0 {
            return Err(ValidationError::InvalidAmountTolerance);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_webhook_secret: SecretString::new(String::new()),
            signature_max_age_secs: default_signature_max_age(),
            signature_max_skew_secs: default_signature_max_skew(),
            amount_tolerance_minor: 0,
        }
    }
}

fn default_signature_max_age() -> i64 {
    300
}

fn default_signature_max_skew() -> i64 {
    60
}
