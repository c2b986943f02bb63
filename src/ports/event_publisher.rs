//! EventPublisher port - interface for publishing domain events.
//!
//! The pipeline publishes after persisting, so subscribers (the realtime
//! bridge, external consumers via Redis) see at-least-once delivery of
//! facts that actually happened.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (handlers may receive duplicates)
/// - `publish_all` preserves the order of the given events
/// - Errors are propagated to the caller
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish multiple events in order.
    ///
    /// Adapters without a batch primitive publish sequentially; a failure
    /// mid-batch leaves earlier events delivered.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
