//! WebhookEventStore port - durable record of every gateway delivery.
//!
//! The store is the idempotency anchor of the whole pipeline: the claim
//! operation is the single point where concurrent duplicate deliveries
//! are collapsed, and the ownership CAS is what keeps re-attempts from
//! double-processing an event another worker still owns.
//!
//! ## Why the claim must be atomic
//!
//! The gateway retries aggressively: network timeouts, 5xx answers and
//! lost acks all cause redelivery, and retries of the same logical event
//! can arrive in the same millisecond. Whatever the backing store, the
//! insert-or-bump must be one atomic operation so that exactly one caller
//! observes `Claimed`.

use async_trait::async_trait;

use crate::domain::billing::{ProcessingStatus, WebhookEvent};
use crate::domain::foundation::{DomainError, EventId, OrderId, Timestamp};

/// Result of the atomic record-and-claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// First receipt; the caller owns initial processing.
    Claimed,
    /// The event already existed; its replay count was incremented and
    /// nothing else changed. `replay_count` is the post-increment value.
    Duplicate {
        replay_count: i64,
        prior_status: ProcessingStatus,
    },
}

impl ClaimOutcome {
    /// True only for the single caller that inserted the record.
    pub fn is_new(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }
}

/// Port for the webhook event store.
///
/// Implementations must guarantee:
/// - `record_and_claim` is atomic: for N concurrent calls with the same
///   event id, exactly one returns `Claimed`
/// - `begin_processing` is a compare-and-set on the processing status:
///   at most one concurrent caller per event receives `true`
/// - records are never deleted outside `purge_test_records`
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Inserts the event, or bumps `replay_count` if it already exists.
    async fn record_and_claim(&self, event: WebhookEvent) -> Result<ClaimOutcome, DomainError>;

    /// Attempts to take processing ownership of a stored event.
    ///
    /// Succeeds for STORED and FAILED records, and for PROCESSING records
    /// whose owner started before `stale_before` (presumed crashed). On
    /// success the status becomes PROCESSING with a fresh start time.
    /// Returns `false` when the event is PROCESSED, freshly owned, or
    /// missing.
    async fn begin_processing(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Marks the event PROCESSED and clears any prior error.
    async fn mark_processed(&self, event_id: &EventId) -> Result<(), DomainError>;

    /// Marks the event FAILED with the failure detail.
    async fn mark_failed(&self, event_id: &EventId, error: &str) -> Result<(), DomainError>;

    /// Loads one event by its idempotency key.
    async fn find_by_event_id(&self, event_id: &EventId)
        -> Result<Option<WebhookEvent>, DomainError>;

    /// Most recently received event for an order.
    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<WebhookEvent>, DomainError>;

    /// Most recently received event overall.
    async fn find_latest(&self) -> Result<Option<WebhookEvent>, DomainError>;

    /// PROCESSING events whose owner started before `before`, oldest
    /// first, capped at `limit`. Feed for the reconciler.
    async fn find_stale_processing(
        &self,
        before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEvent>, DomainError>;

    /// Deletes events whose order id starts with `order_prefix`.
    ///
    /// The one sanctioned deletion path: replay-storm test records are
    /// recognizable by their order prefix and must not pollute the audit
    /// trail. Returns the number of rows removed.
    async fn purge_test_records(&self, order_prefix: &str) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn WebhookEventStore) {}

    #[test]
    fn claimed_is_new() {
        assert!(ClaimOutcome::Claimed.is_new());
    }

    #[test]
    fn duplicate_is_not_new() {
        let outcome = ClaimOutcome::Duplicate {
            replay_count: 3,
            prior_status: ProcessingStatus::Processed,
        };
        assert!(!outcome.is_new());
    }
}
