//! EventSubscriber port - interface for subscribing to domain events.
//!
//! In-process consumers (the websocket bridge above all) register
//! handlers by event type without knowing the transport.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Idempotent** - the pipeline delivers at-least-once
/// - **Quick** - long operations belong in their own task
/// - **Isolated** - one handler's error must not affect the others
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    ///
    /// The same handler instance is invoked for any matching event type.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

// Blanket implementation - any type that implements both traits is an EventBus
impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
