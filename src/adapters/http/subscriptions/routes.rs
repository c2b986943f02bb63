//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_sync_status, refresh_subscription, SubscriptionsAppState};

/// Create the subscription API router.
///
/// # Routes
/// - `POST /:id/refresh` - Apply the catalog's current subject set
/// - `GET /:id/sync-status` - Report pending changes without writing
pub fn subscription_routes() -> Router<SubscriptionsAppState> {
    Router::new()
        .route("/:id/refresh", post(refresh_subscription))
        .route("/:id/sync-status", get(get_sync_status))
}

/// Create the complete subscriptions module router, for mounting at
/// `/usersubscriptions`.
pub fn subscriptions_router() -> Router<SubscriptionsAppState> {
    Router::new().nest("/usersubscriptions", subscription_routes())
}
