//! Redis pub/sub event publisher.
//!
//! Publishes envelopes to `events:{event_type}` channels so external
//! consumers and other instances can follow the pipeline. Fire-and-forget
//! pub/sub: subscribers that are offline miss events, which is acceptable
//! because the webhook event store remains the durable record.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Redis-backed implementation of `EventPublisher`.
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: MultiplexedConnection,
}

impl RedisEventPublisher {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    fn channel(event_type: &str) -> String {
        format!("events:{}", event_type)
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&event).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to serialize event envelope: {}", e),
            )
        })?;

        let channel = Self::channel(&event.event_type);
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(&channel, payload).await.map_err(|e| {
            DomainError::new(
                ErrorCode::CacheError,
                format!("Redis publish failed: {}", e),
            )
        })?;

        debug!(
            channel,
            event_id = %event.event_id,
            receivers,
            "Published event to Redis"
        );
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
