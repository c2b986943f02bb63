//! In-memory webhook event store.
//!
//! Backs tests and local development. A single write lock makes the
//! claim and the ownership CAS atomic, the same guarantees the Postgres
//! adapter gets from its upsert and conditional update.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::billing::{ProcessingStatus, WebhookEvent};
use crate::domain::foundation::{DomainError, ErrorCode, EventId, OrderId, Timestamp};
use crate::ports::{ClaimOutcome, WebhookEventStore};

/// In-memory implementation of `WebhookEventStore`.
pub struct InMemoryWebhookEventStore {
    events: RwLock<HashMap<EventId, WebhookEvent>>,
}

impl InMemoryWebhookEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of one record, for test assertions.
    pub fn get(&self, event_id: &EventId) -> Option<WebhookEvent> {
        self.events
            .read()
            .expect("InMemoryWebhookEventStore: lock poisoned")
            .get(event_id)
            .cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.events
            .read()
            .expect("InMemoryWebhookEventStore: lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryWebhookEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookEventStore for InMemoryWebhookEventStore {
    async fn record_and_claim(&self, event: WebhookEvent) -> Result<ClaimOutcome, DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryWebhookEventStore: lock poisoned");

        match events.get_mut(&event.event_id) {
            Some(existing) => {
                existing.replay_count += 1;
                existing.updated_at = Timestamp::now();
                Ok(ClaimOutcome::Duplicate {
                    replay_count: existing.replay_count,
                    prior_status: existing.processing_status,
                })
            }
            None => {
                events.insert(event.event_id.clone(), event);
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn begin_processing(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryWebhookEventStore: lock poisoned");

        let Some(event) = events.get_mut(event_id) else {
            return Ok(false);
        };
        if !event.eligible_for_reattempt(stale_before) {
            return Ok(false);
        }

        event.processing_status = ProcessingStatus::Processing;
        event.processing_started_at = Some(Timestamp::now());
        event.updated_at = Timestamp::now();
        Ok(true)
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), DomainError> {
        self.mark(event_id, ProcessingStatus::Processed, None)
    }

    async fn mark_failed(&self, event_id: &EventId, error: &str) -> Result<(), DomainError> {
        self.mark(event_id, ProcessingStatus::Failed, Some(error.to_string()))
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookEvent>, DomainError> {
        Ok(self.get(event_id))
    }

    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<WebhookEvent>, DomainError> {
        let events = self
            .events
            .read()
            .expect("InMemoryWebhookEventStore: lock poisoned");
        Ok(events
            .values()
            .filter(|e| &e.order_id == order_id)
            .max_by_key(|e| e.received_at)
            .cloned())
    }

    async fn find_latest(&self) -> Result<Option<WebhookEvent>, DomainError> {
        let events = self
            .events
            .read()
            .expect("InMemoryWebhookEventStore: lock poisoned");
        Ok(events.values().max_by_key(|e| e.received_at).cloned())
    }

    async fn find_stale_processing(
        &self,
        before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEvent>, DomainError> {
        let events = self
            .events
            .read()
            .expect("InMemoryWebhookEventStore: lock poisoned");

        let mut stale: Vec<WebhookEvent> = events
            .values()
            .filter(|e| {
                e.processing_status == ProcessingStatus::Processing
                    && e.processing_started_at
                        .map(|started| started.is_before(&before))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        stale.sort_by_key(|e| e.processing_started_at.unwrap_or(e.received_at));
        stale.truncate(limit as usize);
        Ok(stale)
    }

    async fn purge_test_records(&self, order_prefix: &str) -> Result<u64, DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryWebhookEventStore: lock poisoned");
        let before = events.len();
        events.retain(|_, e| !e.order_id.as_str().starts_with(order_prefix));
        Ok((before - events.len()) as u64)
    }
}

impl InMemoryWebhookEventStore {
    fn mark(
        &self,
        event_id: &EventId,
        status: ProcessingStatus,
        error: Option<String>,
    ) -> Result<(), DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryWebhookEventStore: lock poisoned");
        let event = events.get_mut(event_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::EventNotFound,
                format!("No stored event {}", event_id),
            )
        })?;
        event.processing_status = status;
        event.error_message = error;
        event.updated_at = Timestamp::now();
        Ok(())
    }
}
