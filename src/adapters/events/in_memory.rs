//! In-memory event bus.
//!
//! Synchronous, deterministic delivery for tests and for single-process
//! deployments where the websocket bridge is the only subscriber.
//! Captured events double as test assertions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-memory event bus implementing both event ports.
///
/// Handlers run inline on the publisher's task, so a published event is
/// fully delivered by the time `publish` returns. Lock operations use
/// `.expect()`; a poisoned lock is unrecoverable here.
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// All published events, in order.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Published events of one type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Number of published events.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    /// Whether at least one event of this type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|e| e.event_type == event_type)
    }

    /// Clears captured events (test isolation).
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .push(event.clone());

        // Clone handlers so the lock is released before any await
        let type_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self
                .handlers
                .read()
                .expect("InMemoryEventBus: handlers lock poisoned");
            handlers.get(&event.event_type).cloned().unwrap_or_default()
        };

        let mut errors = Vec::new();
        for handler in type_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            ));
        }
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("InMemoryEventBus: handlers lock poisoned");
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("InMemoryEventBus: handlers lock poisoned");
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: "Invoice".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    #[tokio::test]
    async fn publish_captures_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(envelope("billing.invoice_paid.v1", "inv-1"))
            .await
            .unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("billing.invoice_paid.v1"));
    }

    #[tokio::test]
    async fn subscribed_handler_receives_matching_events_only() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("billing.invoice_paid.v1", handler.clone());

        bus.publish(envelope("billing.invoice_paid.v1", "inv-1"))
            .await
            .unwrap();
        bus.publish(envelope("billing.payment_failed.v1", "inv-2"))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_all_registers_for_every_type() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe_all(
            &[
                "enrollment.subscription_activated.v1",
                "enrollment.subscription_synced.v1",
            ],
            handler.clone(),
        );

        bus.publish(envelope("enrollment.subscription_activated.v1", "sub-1"))
            .await
            .unwrap();
        bus.publish(envelope("enrollment.subscription_synced.v1", "sub-1"))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn events_of_type_filters() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("a.v1", "1")).await.unwrap();
        bus.publish(envelope("b.v1", "2")).await.unwrap();
        bus.publish(envelope("a.v1", "3")).await.unwrap();

        assert_eq!(bus.events_of_type("a.v1").len(), 2);
    }
}
