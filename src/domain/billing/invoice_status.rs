//! Invoice status state machine.
//!
//! Defines all possible invoice states and valid transitions
//! according to the payment lifecycle.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Invoice payment status.
///
/// Represents the current state of an order's invoice in the
/// payment lifecycle. Terminal states absorb further gateway
/// events without changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Invoice created but not yet presented for payment.
    Draft,

    /// Awaiting payment from the gateway.
    Pending,

    /// One or more installments received, balance outstanding.
    PartiallyPaid,

    /// Fully settled. Terminal.
    Paid,

    /// Payment failed or order expired. Terminal.
    Failed,

    /// Order cancelled before settlement. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Returns true if the invoice still has an outstanding balance
    /// that a gateway event could settle.
    pub fn awaits_payment(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Draft | InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid
        )
    }

    /// Returns true if the invoice is fully settled.
    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    /// Database/API string form (e.g. "PARTIALLY_PAID").
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Failed => "FAILED",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PARTIALLY_PAID" => Ok(InvoiceStatus::PartiallyPaid),
            "PAID" => Ok(InvoiceStatus::Paid),
            "FAILED" => Ok(InvoiceStatus::Failed),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "invoice_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for InvoiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, target),
            // From DRAFT
            (Draft, Pending)
                | (Draft, Cancelled)
            // From PENDING
                | (Pending, PartiallyPaid)
                | (Pending, Paid)
                | (Pending, Failed)
                | (Pending, Cancelled)
            // From PARTIALLY_PAID
                | (PartiallyPaid, PartiallyPaid) // Another installment
                | (PartiallyPaid, Paid)
                | (PartiallyPaid, Failed)
                | (PartiallyPaid, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InvoiceStatus::*;
        match self {
            Draft => vec![Pending, Cancelled],
            Pending => vec![PartiallyPaid, Paid, Failed, Cancelled],
            PartiallyPaid => vec![PartiallyPaid, Paid, Failed, Cancelled],
            Paid => vec![],
            Failed => vec![],
            Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests - State Transitions

    #[test]
    fn draft_can_transition_to_pending() {
        let status = InvoiceStatus::Draft;
        assert!(status.can_transition_to(&InvoiceStatus::Pending));

        let result = status.transition_to(InvoiceStatus::Pending);
        assert_eq!(result, Ok(InvoiceStatus::Pending));
    }

    #[test]
    fn draft_cannot_skip_to_paid() {
        let status = InvoiceStatus::Draft;
        assert!(!status.can_transition_to(&InvoiceStatus::Paid));

        let result = status.transition_to(InvoiceStatus::Paid);
        assert!(result.is_err());
    }

    #[test]
    fn pending_can_transition_to_paid() {
        let status = InvoiceStatus::Pending;
        assert!(status.can_transition_to(&InvoiceStatus::Paid));

        let result = status.transition_to(InvoiceStatus::Paid);
        assert_eq!(result, Ok(InvoiceStatus::Paid));
    }

    #[test]
    fn pending_can_transition_to_partially_paid() {
        let status = InvoiceStatus::Pending;
        assert!(status.can_transition_to(&InvoiceStatus::PartiallyPaid));
    }

    #[test]
    fn pending_can_transition_to_failed() {
        let status = InvoiceStatus::Pending;
        assert!(status.can_transition_to(&InvoiceStatus::Failed));
    }

    #[test]
    fn pending_can_transition_to_cancelled() {
        let status = InvoiceStatus::Pending;
        assert!(status.can_transition_to(&InvoiceStatus::Cancelled));
    }

    #[test]
    fn partially_paid_accepts_another_installment() {
        let status = InvoiceStatus::PartiallyPaid;
        assert!(status.can_transition_to(&InvoiceStatus::PartiallyPaid));

        let result = status.transition_to(InvoiceStatus::PartiallyPaid);
        assert_eq!(result, Ok(InvoiceStatus::PartiallyPaid));
    }

    #[test]
    fn partially_paid_can_complete_to_paid() {
        let status = InvoiceStatus::PartiallyPaid;
        assert!(status.can_transition_to(&InvoiceStatus::Paid));
    }

    #[test]
    fn partially_paid_can_fail() {
        let status = InvoiceStatus::PartiallyPaid;
        assert!(status.can_transition_to(&InvoiceStatus::Failed));

        let result = status.transition_to(InvoiceStatus::Failed);
        assert_eq!(result, Ok(InvoiceStatus::Failed));
    }

    #[test]
    fn paid_is_terminal() {
        let status = InvoiceStatus::Paid;
        assert!(status.is_terminal());
        assert!(!status.can_transition_to(&InvoiceStatus::Pending));
        assert!(!status.can_transition_to(&InvoiceStatus::Failed));
        assert!(!status.can_transition_to(&InvoiceStatus::Paid));
    }

    #[test]
    fn failed_is_terminal() {
        let status = InvoiceStatus::Failed;
        assert!(status.is_terminal());
        assert!(!status.can_transition_to(&InvoiceStatus::Paid));
    }

    #[test]
    fn cancelled_is_terminal() {
        let status = InvoiceStatus::Cancelled;
        assert!(status.is_terminal());
        assert!(!status.can_transition_to(&InvoiceStatus::Paid));
        assert!(!status.can_transition_to(&InvoiceStatus::Pending));
    }

    #[test]
    fn paid_cannot_be_reversed_by_failure() {
        let status = InvoiceStatus::Paid;
        let result = status.transition_to(InvoiceStatus::Failed);
        assert!(result.is_err());
    }

    // Unit Tests - awaits_payment

    #[test]
    fn awaits_payment_true_for_draft() {
        assert!(InvoiceStatus::Draft.awaits_payment());
    }

    #[test]
    fn awaits_payment_true_for_pending() {
        assert!(InvoiceStatus::Pending.awaits_payment());
    }

    #[test]
    fn awaits_payment_true_for_partially_paid() {
        assert!(InvoiceStatus::PartiallyPaid.awaits_payment());
    }

    #[test]
    fn awaits_payment_false_for_terminal_states() {
        assert!(!InvoiceStatus::Paid.awaits_payment());
        assert!(!InvoiceStatus::Failed.awaits_payment());
        assert!(!InvoiceStatus::Cancelled.awaits_payment());
    }

    // String mapping

    #[test]
    fn as_str_round_trips_through_from_str() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid,
            InvoiceStatus::Failed,
            InvoiceStatus::Cancelled,
        ] {
            let parsed: InvoiceStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn from_str_rejects_unknown_status() {
        let result: Result<InvoiceStatus, _> = "REFUNDED".parse();
        assert!(result.is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap();
        assert_eq!(json, r#""PARTIALLY_PAID""#);

        let parsed: InvoiceStatus = serde_json::from_str(r#""PAID""#).unwrap();
        assert_eq!(parsed, InvoiceStatus::Paid);
    }

    // Additional validation tests

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid,
            InvoiceStatus::Failed,
            InvoiceStatus::Cancelled,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }
}
