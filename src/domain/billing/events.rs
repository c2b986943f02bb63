//! Domain events emitted by invoice settlement.
//!
//! Each event captures one observable fact about an invoice. They are
//! published after the state change is persisted, so subscribers may see
//! an event at-least-once but never for a write that did not happen.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CourseId, EventId, InvoiceId, OrderId, Timestamp, UserId};
use crate::domain_event;

/// The full order total has settled; entitlement activation follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub course_id: CourseId,
    pub amount_paid_minor: i64,
    pub currency: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    InvoicePaid,
    event_type = "billing.invoice_paid.v1",
    schema_version = 1,
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = occurred_at,
    event_id = event_id
);

/// An installment settled but a balance remains outstanding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePartiallyPaid {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub amount_paid_minor: i64,
    pub outstanding_minor: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    InvoicePartiallyPaid,
    event_type = "billing.invoice_partially_paid.v1",
    schema_version = 1,
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = occurred_at,
    event_id = event_id
);

/// The gateway reported the payment failed or the order expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    /// Raw gateway event type that caused the failure.
    pub gateway_event_type: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    PaymentFailed,
    event_type = "billing.payment_failed.v1",
    schema_version = 1,
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = occurred_at,
    event_id = event_id
);

/// The invoice was cancelled by explicit user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub occurred_at: Timestamp,
}

domain_event!(
    InvoiceCancelled,
    event_type = "billing.invoice_cancelled.v1",
    schema_version = 1,
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A settlement amount did not reconcile; the invoice was left untouched
/// and the delivery was routed to the review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountMismatchFlagged {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub expected_minor: i64,
    pub actual_minor: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    AmountMismatchFlagged,
    event_type = "billing.amount_mismatch_flagged.v1",
    schema_version = 1,
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = occurred_at,
    event_id = event_id
);
