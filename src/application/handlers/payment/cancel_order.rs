//! CancelOrderHandler - explicit user cancellation of a pending order.
//!
//! Cancellation is not a gateway event: it comes in through the API and
//! only succeeds while the invoice is still cancellable. Settled or
//! failed invoices stay what they are.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::InvoiceCancelled;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, OrderId, SerializableDomainEvent, Timestamp,
};
use crate::ports::{EventPublisher, InvoiceRepository};

/// Command to cancel an order's invoice.
#[derive(Debug, Clone)]
pub struct CancelOrderCommand {
    pub order_id: OrderId,
}

/// Handler for order cancellation.
pub struct CancelOrderHandler {
    invoices: Arc<dyn InvoiceRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelOrderHandler {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            invoices,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: CancelOrderCommand) -> Result<(), DomainError> {
        let mut invoice = self
            .invoices
            .find_by_order_id(&cmd.order_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OrderNotFound,
                    format!("No invoice for order {}", cmd.order_id),
                )
            })?;

        invoice.cancel()?;
        self.invoices.update(&invoice).await?;

        let event = InvoiceCancelled {
            event_id: EventId::new(),
            invoice_id: invoice.id,
            order_id: invoice.order_id.clone(),
            occurred_at: Timestamp::now(),
        };
        self.event_publisher.publish(event.to_envelope()).await?;

        info!(order_id = %cmd.order_id, "Invoice cancelled");
        Ok(())
    }
}
