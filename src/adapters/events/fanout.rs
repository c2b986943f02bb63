//! Fan-out publisher composing several `EventPublisher` sinks.
//!
//! Production wiring sends every event both to the in-process bus (for
//! the websocket bridge) and to Redis (for external consumers). Each
//! sink gets the event even if an earlier sink failed; the first error
//! is reported after all sinks ran.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Publishes each event to every configured sink.
pub struct FanoutPublisher {
    sinks: Vec<Arc<dyn EventPublisher>>,
}

impl FanoutPublisher {
    pub fn new(sinks: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventPublisher for FanoutPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: "inv-1".to_string(),
            aggregate_type: "Invoice".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    #[tokio::test]
    async fn every_sink_receives_the_event() {
        let a = Arc::new(InMemoryEventBus::new());
        let b = Arc::new(InMemoryEventBus::new());
        let fanout = FanoutPublisher::new(vec![a.clone(), b.clone()]);

        fanout
            .publish(envelope("billing.invoice_paid.v1"))
            .await
            .unwrap();

        assert_eq!(a.event_count(), 1);
        assert_eq!(b.event_count(), 1);
    }
}
