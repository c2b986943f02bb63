//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between
//! ports. Command handlers (write) are kept separate from query
//! handlers (read).

pub mod handlers;

pub use handlers::payment::{
    ActivateOrderCommand, ActivateOrderHandler, ActivationOutcome, CancelOrderCommand,
    CancelOrderHandler, GetOrderStatusHandler, GetOrderStatusQuery, IngestOutcome,
    IngestWebhookCommand, IngestWebhookHandler, OrderStatusView, ReconcileStaleHandler,
    ReplayStormCommand, ReplayStormHandler, ReplayStormReport,
};

pub use handlers::enrollment::SyncSubscriptionHandler;
