//! Event bridge connecting domain events to WebSocket clients.
//!
//! Subscribes to enrollment-relevant domain events and broadcasts them
//! to connected clients in the owning user's room.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope, UserId};
use crate::ports::{EventHandler, EventSubscriber};

use super::messages::{EnrollmentUpdate, EnrollmentUpdateType};
use super::rooms::RoomManager;

/// Event types that are relevant for connected clients.
pub const ENROLLMENT_EVENT_TYPES: &[&str] = &[
    "enrollment.subscription_activated.v1",
    "enrollment.activation_failed.v1",
    "enrollment.subscription_synced.v1",
];

/// Bridge between the event bus and WebSocket connections.
///
/// Implements `EventHandler` to receive domain events and broadcast
/// them to connected clients in the owning user's room.
pub struct WebSocketEventBridge {
    room_manager: Arc<RoomManager>,
}

impl WebSocketEventBridge {
    pub fn new(room_manager: Arc<RoomManager>) -> Self {
        Self { room_manager }
    }

    /// Create as an Arc (for sharing with event subscriber).
    pub fn new_shared(room_manager: Arc<RoomManager>) -> Arc<Self> {
        Arc::new(Self::new(room_manager))
    }

    /// Register this bridge with an event subscriber.
    pub fn register(self: &Arc<Self>, subscriber: &impl EventSubscriber) {
        subscriber.subscribe_all(ENROLLMENT_EVENT_TYPES, self.clone());
    }

    /// Transform a domain event envelope into an enrollment update.
    ///
    /// Returns `None` if the event type is not relevant for clients.
    fn transform(&self, event: &EventEnvelope) -> Option<EnrollmentUpdate> {
        let update_type = match event.event_type.as_str() {
            "enrollment.subscription_activated.v1" => EnrollmentUpdateType::SubscriptionActivated,
            "enrollment.activation_failed.v1" => EnrollmentUpdateType::ActivationFailed,
            "enrollment.subscription_synced.v1" => EnrollmentUpdateType::SubscriptionSynced,
            _ => return None,
        };

        Some(EnrollmentUpdate {
            update_type,
            data: event.payload.clone(),
            timestamp: event.occurred_at,
        })
    }

    /// Resolve the owning user from an event envelope.
    ///
    /// Enrollment events carry the user in their payload; the aggregate
    /// is the subscription grant.
    fn resolve_user_id(&self, event: &EventEnvelope) -> Option<UserId> {
        event
            .payload
            .get("user_id")
            .and_then(|v| v.as_str())
            .and_then(|s| UserId::new(s).ok())
    }
}

#[async_trait]
impl EventHandler for WebSocketEventBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let Some(update) = self.transform(&event) else {
            return Ok(());
        };

        let Some(user_id) = self.resolve_user_id(&event) else {
            tracing::debug!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                "Cannot resolve user for event, skipping WebSocket broadcast"
            );
            return Ok(());
        };

        self.room_manager.broadcast_to_user(&user_id, update).await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "WebSocketEventBridge"
    }
}
