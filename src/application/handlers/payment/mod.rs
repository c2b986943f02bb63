//! Payment handlers - webhook ingestion, activation, replay, queries.

mod activate_order;
mod cancel_order;
mod get_order_status;
mod ingest_webhook;
mod reconcile_stale;
mod replay_storm;

pub use activate_order::{ActivateOrderCommand, ActivateOrderHandler, ActivationOutcome};
pub use cancel_order::{CancelOrderCommand, CancelOrderHandler};
pub use get_order_status::{GetOrderStatusHandler, GetOrderStatusQuery, OrderStatusView};
pub use ingest_webhook::{IngestOutcome, IngestWebhookCommand, IngestWebhookHandler};
pub use reconcile_stale::{ReconcileReport, ReconcileStaleHandler};
pub use replay_storm::{
    ReplayStormCommand, ReplayStormHandler, ReplayStormReport, ReplayTally, SubscriptionCheck,
};
