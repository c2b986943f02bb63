//! Monetary amount value object.
//!
//! Amounts are carried in minor units (cents for two-decimal currencies) so
//! settlement arithmetic stays integral. Comparisons against an invoice total
//! go through [`Money::matches`], which applies the configured minor-unit
//! tolerance.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO-4217 currency code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a currency code, validating the three-letter alphabetic form.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("'{}' is not a three-letter ISO-4217 code", trimmed),
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the inner code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary amount in minor units with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Creates an amount, rejecting negative values.
    pub fn new(amount_minor: i64, currency: CurrencyCode) -> Result<Self, ValidationError> {
        if amount_minor < 0 {
            return Err(ValidationError::out_of_range(
                "amount_minor",
                0,
                i64::MAX,
                amount_minor,
            ));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Zero in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount_minor: 0,
            currency,
        }
    }

    /// Returns the amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the currency.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Whether both amounts share a currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Sums two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> Result<Money, ValidationError> {
        if !self.same_currency(other) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!(
                    "cannot add {} to {}",
                    other.currency, self.currency
                ),
            ));
        }
        let amount = self.amount_minor.checked_add(other.amount_minor).ok_or_else(|| {
            ValidationError::invalid_format("amount_minor", "amount overflow".to_string())
        })?;
        Ok(Money {
            amount_minor: amount,
            currency: self.currency.clone(),
        })
    }

    /// Whether `other` equals this amount within `tolerance_minor` units.
    ///
    /// A currency mismatch never matches, whatever the tolerance.
    pub fn matches(&self, other: &Money, tolerance_minor: i64) -> bool {
        self.same_currency(other)
            && (self.amount_minor - other.amount_minor).abs() <= tolerance_minor
    }

    /// Whether this amount is strictly below `other` (same currency assumed checked).
    pub fn is_less_than(&self, other: &Money) -> bool {
        self.amount_minor < other.amount_minor
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor, self.currency)
    }
}
