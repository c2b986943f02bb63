//! Billing domain - webhook ingestion and invoice settlement.
//!
//! Everything money-related lives here: the invoice state machine, the
//! stored webhook delivery record, gateway payload parsing and signature
//! verification, and the error taxonomy the webhook endpoint answers with.

mod events;
mod gateway_event;
mod invoice;
mod invoice_status;
mod webhook_errors;
mod webhook_event;
mod webhook_verifier;

pub use events::{
    AmountMismatchFlagged, InvoiceCancelled, InvoicePaid, InvoicePartiallyPaid, PaymentFailed,
};
pub use gateway_event::{GatewayEventType, GatewayNotification};
pub use invoice::{Invoice, Settlement};
pub use invoice_status::InvoiceStatus;
pub use webhook_errors::WebhookError;
pub use webhook_event::{ProcessingStatus, WebhookEvent};
pub use webhook_verifier::{GatewayWebhookVerifier, SignatureHeader};

#[cfg(test)]
pub use gateway_event::GatewayNotificationBuilder;
