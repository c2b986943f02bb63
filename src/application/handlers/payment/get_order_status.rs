//! GetOrderStatusHandler - read model for one order's payment state.

use std::sync::Arc;

use crate::domain::billing::{Invoice, ProcessingStatus};
use crate::domain::enrollment::Subscription;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::ports::{InvoiceRepository, ReviewNote, SubscriptionRepository, WebhookEventStore};

/// Query for the status of one gateway order.
#[derive(Debug, Clone)]
pub struct GetOrderStatusQuery {
    pub order_id: OrderId,
}

/// Everything known about an order: the invoice, the grant if one was
/// activated, any review flags, and the latest delivery's processing
/// state.
#[derive(Debug, Clone)]
pub struct OrderStatusView {
    pub invoice: Invoice,
    pub subscription: Option<Subscription>,
    pub review_notes: Vec<ReviewNote>,
    pub latest_delivery_status: Option<ProcessingStatus>,
}

/// Query handler for order status.
pub struct GetOrderStatusHandler {
    invoices: Arc<dyn InvoiceRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    event_store: Arc<dyn WebhookEventStore>,
}

impl GetOrderStatusHandler {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        event_store: Arc<dyn WebhookEventStore>,
    ) -> Self {
        Self {
            invoices,
            subscriptions,
            event_store,
        }
    }

    pub async fn handle(&self, query: GetOrderStatusQuery) -> Result<OrderStatusView, DomainError> {
        let invoice = self
            .invoices
            .find_by_order_id(&query.order_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OrderNotFound,
                    format!("No invoice for order {}", query.order_id),
                )
            })?;

        let subscription = self
            .subscriptions
            .find_by_user_and_order(&invoice.customer_id, &query.order_id)
            .await?;

        let review_notes = self.invoices.review_notes_for_order(&query.order_id).await?;

        let latest_delivery_status = self
            .event_store
            .find_latest_for_order(&query.order_id)
            .await?
            .map(|event| event.processing_status);

        Ok(OrderStatusView {
            invoice,
            subscription,
            review_notes,
            latest_delivery_status,
        })
    }
}
