//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure.

pub mod payment;
pub mod subscriptions;

// Re-export key types for convenience
pub use payment::payment_router;
pub use payment::PaymentAppState;
pub use subscriptions::subscriptions_router;
pub use subscriptions::SubscriptionsAppState;
