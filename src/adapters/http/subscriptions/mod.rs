//! HTTP adapter for the subscriptions module.
//!
//! Exposes manual grant refresh and sync-status inspection.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{SubscriptionsApiError, SubscriptionsAppState};
pub use routes::{subscription_routes, subscriptions_router};
