//! Axum router configuration for payment endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    cancel_order, get_order_status, handle_gateway_webhook, purge_test_records, run_replay_storm,
    PaymentAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// ## Webhook Endpoint (no auth, signature verified)
/// - `POST /webhook` - Ingest a gateway webhook delivery
///
/// ## Order Endpoints
/// - `GET /order/:order_id` - Full status of one order
/// - `POST /order/:order_id/cancel` - Cancel a pending order
///
/// ## Test Harness (feature-gated, 403 when disabled)
/// - `POST /replay-storm` - Storm-replay a stored delivery
/// - `DELETE /test-records` - Purge deliveries for test-marked orders
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/webhook", post(handle_gateway_webhook))
        .route("/order/:order_id", get(get_order_status))
        .route("/order/:order_id/cancel", post(cancel_order))
        .route("/replay-storm", post(run_replay_storm))
        .route("/test-records", delete(purge_test_records))
}

/// Create the complete payment module router, for mounting at `/payment`.
pub fn payment_router() -> Router<PaymentAppState> {
    Router::new().nest("/payment", payment_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessLockMap;
    use crate::adapters::memory::{
        InMemoryCourseCatalog, InMemoryInvoiceRepository, InMemorySubscriptionRepository,
        InMemoryWebhookEventStore,
    };
    use crate::application::handlers::payment::{
        ActivateOrderHandler, IngestWebhookHandler, ReplayStormHandler,
    };
    use crate::domain::billing::GatewayWebhookVerifier;

    fn test_state() -> PaymentAppState {
        let event_store = Arc::new(InMemoryWebhookEventStore::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let catalog = Arc::new(InMemoryCourseCatalog::new());
        let locks = Arc::new(InProcessLockMap::new(Duration::from_secs(3)));
        let bus = Arc::new(InMemoryEventBus::new());

        let activation = Arc::new(ActivateOrderHandler::new(
            subscriptions.clone(),
            catalog,
            invoices.clone(),
            locks,
            bus.clone(),
        ));
        let ingest = Arc::new(IngestWebhookHandler::new(
            GatewayWebhookVerifier::new("whsec_test_secret"),
            event_store.clone(),
            invoices.clone(),
            activation,
            bus.clone(),
            0,
            300,
        ));
        let replay_storm = Arc::new(ReplayStormHandler::new(
            event_store.clone(),
            subscriptions.clone(),
            ingest.clone(),
            false,
            "TEST-",
        ));

        PaymentAppState {
            ingest,
            replay_storm,
            invoices,
            subscriptions,
            event_store,
            event_publisher: bus,
        }
    }

    #[test]
    fn payment_routes_creates_router() {
        let router = payment_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn payment_router_creates_combined_router() {
        let router = payment_router();
        let _: Router<()> = router.with_state(test_state());
    }
}
