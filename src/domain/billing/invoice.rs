//! Invoice aggregate entity.
//!
//! The Invoice is the financial record of one purchase attempt, keyed 1:1
//! to the gateway order. Settlement events from the gateway move it through
//! the `InvoiceStatus` state machine; entitlement is granted elsewhere and
//! only when a settlement completes the full total.
//!
//! # Design Decisions
//!
//! - **One per order**: unique constraint on order_id enforced at database level
//! - **Money in minor units**: all monetary values are i64 minor units (not floats)
//! - **Terminal absorption**: late events against PAID/FAILED/CANCELLED are
//!   reported as no-ops, never as errors
//! - **Reject, never adjust**: an amount that does not reconcile leaves both
//!   status and amounts untouched

use crate::domain::foundation::{
    CourseId, DomainError, ErrorCode, InvoiceId, Money, OrderId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::gateway_event::GatewayEventType;
use super::invoice_status::InvoiceStatus;
use super::webhook_errors::WebhookError;

/// Outcome of applying one settlement event to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The event moved the invoice; activation fires only when the full
    /// total settled.
    Transitioned {
        new_status: InvoiceStatus,
        activation_required: bool,
    },
    /// The invoice was already terminal; nothing changed.
    TerminalNoOp { status: InvoiceStatus },
}

/// Invoice aggregate - the financial record of one purchase attempt.
///
/// # Invariants
///
/// - `order_id` is unique (one invoice per gateway order)
/// - `amount_paid <= total_amount`, same currency
/// - Status transitions follow state machine rules; terminal states absorb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier for this invoice.
    pub id: InvoiceId,

    /// Gateway order this invoice bills.
    pub order_id: OrderId,

    /// User who placed the order.
    pub customer_id: UserId,

    /// Course being purchased.
    pub course_id: CourseId,

    /// Current status in the payment lifecycle.
    pub status: InvoiceStatus,

    /// Full price of the order.
    pub total_amount: Money,

    /// Sum of settlements received so far.
    pub amount_paid: Money,

    /// Optimistic concurrency version, bumped by the repository on save.
    pub version: i64,

    /// When the invoice was created.
    pub created_at: Timestamp,

    /// When the invoice was last updated.
    pub updated_at: Timestamp,
}

impl Invoice {
    /// Create a new draft invoice for an order.
    pub fn create(
        id: InvoiceId,
        order_id: OrderId,
        customer_id: UserId,
        course_id: CourseId,
        total_amount: Money,
    ) -> Self {
        let now = Timestamp::now();
        let amount_paid = Money::zero(total_amount.currency().clone());
        Self {
            id,
            order_id,
            customer_id,
            course_id,
            status: InvoiceStatus::Draft,
            total_amount,
            amount_paid,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Submit the invoice for payment (gateway order created upstream).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn submit(&mut self) -> Result<(), DomainError> {
        self.transition_to(InvoiceStatus::Pending)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancel the invoice on explicit user action.
    ///
    /// Cancellation is not a gateway event; a settled or failed invoice
    /// cannot be cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(InvoiceStatus::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Balance still owed, in minor units.
    pub fn outstanding_minor(&self) -> i64 {
        self.total_amount.amount_minor() - self.amount_paid.amount_minor()
    }

    /// Applies one gateway settlement event.
    ///
    /// Terminal invoices absorb the event as a no-op. Otherwise:
    /// - `PAYMENT_SUCCESS` asserts settlement of the full outstanding
    ///   balance; anything else is an `AmountMismatch` and changes nothing.
    /// - `PARTIAL_PAYMENT` accumulates installments, completing to PAID on
    ///   the exact total and rejecting overpayment.
    /// - `PAYMENT_FAILURE` / `ORDER_EXPIRED` move to FAILED, amount ignored.
    ///
    /// Amount comparison happens in minor units within `tolerance_minor`;
    /// a currency mismatch never reconciles.
    ///
    /// # Errors
    ///
    /// `MissingField` when a settlement event carries no amount,
    /// `AmountMismatch` when it does not reconcile, `InvalidTransition`
    /// when the target state is unreachable (e.g. events against DRAFT).
    pub fn apply_settlement(
        &mut self,
        event_type: GatewayEventType,
        amount: Option<&Money>,
        tolerance_minor: i64,
    ) -> Result<Settlement, WebhookError> {
        use crate::domain::foundation::StateMachine;

        if self.status.is_terminal() {
            return Ok(Settlement::TerminalNoOp {
                status: self.status,
            });
        }

        match event_type {
            GatewayEventType::PaymentFailure | GatewayEventType::OrderExpired => {
                self.transition_for_event(InvoiceStatus::Failed)?;
                Ok(Settlement::Transitioned {
                    new_status: self.status,
                    activation_required: false,
                })
            }

            GatewayEventType::PaymentSuccess => {
                let amount = self.reconcilable_amount(amount)?;
                let outstanding = self.outstanding_minor();

                if (amount.amount_minor() - outstanding).abs() > tolerance_minor {
                    return Err(WebhookError::AmountMismatch {
                        expected_minor: outstanding,
                        actual_minor: amount.amount_minor(),
                    });
                }

                self.transition_for_event(InvoiceStatus::Paid)?;
                self.record_payment(amount);
                Ok(Settlement::Transitioned {
                    new_status: self.status,
                    activation_required: true,
                })
            }

            GatewayEventType::PartialPayment => {
                let amount = self.reconcilable_amount(amount)?;
                let outstanding = self.outstanding_minor();
                let remainder = outstanding - amount.amount_minor();

                if remainder.abs() <= tolerance_minor {
                    // Final installment completes the total
                    self.transition_for_event(InvoiceStatus::Paid)?;
                    self.record_payment(amount);
                    Ok(Settlement::Transitioned {
                        new_status: self.status,
                        activation_required: true,
                    })
                } else if remainder > 0 {
                    self.transition_for_event(InvoiceStatus::PartiallyPaid)?;
                    self.record_payment(amount);
                    Ok(Settlement::Transitioned {
                        new_status: self.status,
                        activation_required: false,
                    })
                } else {
                    Err(WebhookError::AmountMismatch {
                        expected_minor: outstanding,
                        actual_minor: amount.amount_minor(),
                    })
                }
            }

            GatewayEventType::Unknown => Err(WebhookError::UnknownEventType(
                event_type.as_str().to_string(),
            )),
        }
    }

    /// Validates presence and currency of a settlement amount.
    fn reconcilable_amount<'a>(
        &self,
        amount: Option<&'a Money>,
    ) -> Result<&'a Money, WebhookError> {
        let amount = amount.ok_or(WebhookError::MissingField("amount"))?;
        if !amount.same_currency(&self.total_amount) {
            return Err(WebhookError::AmountMismatch {
                expected_minor: self.outstanding_minor(),
                actual_minor: amount.amount_minor(),
            });
        }
        Ok(amount)
    }

    /// Adds a reconciled amount to `amount_paid`. Only called after the
    /// amount rules and the state transition have both passed.
    fn record_payment(&mut self, amount: &Money) {
        // Rebuilt from raw minor units: the sum was already bounds-checked
        // against total_amount by the caller.
        let summed = self.amount_paid.amount_minor() + amount.amount_minor();
        if let Ok(paid) = Money::new(
            self.total_amount.amount_minor().min(summed),
            self.total_amount.currency().clone(),
        ) {
            self.amount_paid = paid;
        }
        self.updated_at = Timestamp::now();
    }

    /// Transition used by settlement application; maps state machine
    /// rejections into the webhook error taxonomy.
    fn transition_for_event(&mut self, target: InvoiceStatus) -> Result<(), WebhookError> {
        let from = self.status;
        self.transition_to(target)
            .map_err(|_| WebhookError::InvalidTransition(format!("{} -> {}", from, target)))
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: InvoiceStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition invoice from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
