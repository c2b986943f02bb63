//! HTTP adapter for the payment module.
//!
//! Exposes webhook ingestion, order status, cancellation, and the
//! replay-storm test harness.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{PaymentAppState, PaymentApiError, SIGNATURE_HEADER};
pub use routes::{payment_router, payment_routes};
