//! ReplayStormHandler - concurrency test harness over stored deliveries.
//!
//! Re-fires a stored delivery N times, optionally all at once, and then
//! checks the one invariant the whole system exists to uphold: exactly
//! one grant per order. Replays re-enter the regular pipeline, so the
//! storm exercises the production claim and lock paths rather than a
//! simulation of them.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, OrderId};
use crate::ports::{SubscriptionRepository, WebhookEventStore};

use super::ingest_webhook::{IngestOutcome, IngestWebhookHandler};

/// Command to storm-replay a stored delivery.
#[derive(Debug, Clone)]
pub struct ReplayStormCommand {
    /// Order whose latest delivery to replay; latest overall when absent.
    pub order_id: Option<OrderId>,
    /// Number of replays to fire.
    pub replays: u32,
    /// Fire all replays simultaneously instead of one after another.
    pub concurrent: bool,
}

/// Tally of pipeline outcomes across the storm.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReplayTally {
    pub processed: u32,
    pub duplicates: u32,
    pub late: u32,
    pub failed: u32,
}

/// Post-storm verification of the exactly-once invariant.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubscriptionCheck {
    /// Grants recorded against the order after the storm.
    pub count: u64,
    /// True when exactly one grant exists.
    pub passed: bool,
}

/// Everything the storm observed.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStormReport {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub replays: u32,
    pub concurrent: bool,
    pub elapsed_ms: u64,
    pub outcomes: ReplayTally,
    pub subscription_check: SubscriptionCheck,
}

/// Handler that storms a stored delivery through the pipeline.
pub struct ReplayStormHandler {
    event_store: Arc<dyn WebhookEventStore>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    ingest: Arc<IngestWebhookHandler>,
    /// Feature-gated; refused outright when disabled.
    enabled: bool,
    /// Order-id prefix marking synthetic test deliveries.
    test_order_prefix: String,
}

impl ReplayStormHandler {
    pub fn new(
        event_store: Arc<dyn WebhookEventStore>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        ingest: Arc<IngestWebhookHandler>,
        enabled: bool,
        test_order_prefix: impl Into<String>,
    ) -> Self {
        Self {
            event_store,
            subscriptions,
            ingest,
            enabled,
            test_order_prefix: test_order_prefix.into(),
        }
    }

    /// Remove stored deliveries whose order id carries the test prefix.
    ///
    /// Production records are never deleted; only synthetic orders created
    /// by the harness match the prefix.
    pub async fn purge_test_data(&self) -> Result<u64, DomainError> {
        if !self.enabled {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Replay storm is disabled in this environment",
            ));
        }

        let removed = self
            .event_store
            .purge_test_records(&self.test_order_prefix)
            .await?;
        info!(
            removed,
            prefix = %self.test_order_prefix,
            "Purged test deliveries"
        );
        Ok(removed)
    }

    pub async fn handle(&self, cmd: ReplayStormCommand) -> Result<ReplayStormReport, DomainError> {
        if !self.enabled {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Replay storm is disabled in this environment",
            ));
        }
        if cmd.replays == 0 {
            return Err(DomainError::validation(
                "replays",
                "replay count must be at least 1",
            ));
        }

        // Pick the delivery to storm.
        let event = match &cmd.order_id {
            Some(order_id) => self.event_store.find_latest_for_order(order_id).await?,
            None => self.event_store.find_latest().await?,
        }
        .ok_or_else(|| {
            DomainError::new(ErrorCode::EventNotFound, "No stored delivery to replay")
        })?;

        // Rebuild the delivery from its captured bytes. The signature was
        // validated at capture time and is not re-checked.
        let notification = event.notification().map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("stored payload no longer parses: {}", e),
            )
        })?;

        info!(
            event_id = %event.event_id,
            order_id = %event.order_id,
            replays = cmd.replays,
            concurrent = cmd.concurrent,
            "Starting replay storm"
        );

        let started = Instant::now();
        let mut outcomes = ReplayTally::default();

        if cmd.concurrent {
            let mut tasks = Vec::with_capacity(cmd.replays as usize);
            for _ in 0..cmd.replays {
                let ingest = Arc::clone(&self.ingest);
                let notification = notification.clone();
                let payload = event.raw_payload.clone();
                let headers = event.raw_headers.clone();
                tasks.push(tokio::spawn(async move {
                    ingest.process_delivery(notification, payload, headers).await
                }));
            }
            for task in tasks {
                match task.await {
                    Ok(result) => Self::tally(&mut outcomes, result),
                    Err(_) => outcomes.failed += 1,
                }
            }
        } else {
            for _ in 0..cmd.replays {
                let result = self
                    .ingest
                    .process_delivery(
                        notification.clone(),
                        event.raw_payload.clone(),
                        event.raw_headers.clone(),
                    )
                    .await;
                Self::tally(&mut outcomes, result);
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;

        // The invariant check: however many replays raced, exactly one
        // grant may exist for the order.
        let count = self.subscriptions.count_by_order(&event.order_id).await?;
        let subscription_check = SubscriptionCheck {
            count,
            passed: count == 1,
        };

        info!(
            event_id = %event.event_id,
            elapsed_ms,
            grants = count,
            passed = subscription_check.passed,
            "Replay storm finished"
        );

        Ok(ReplayStormReport {
            event_id: event.event_id,
            order_id: event.order_id,
            replays: cmd.replays,
            concurrent: cmd.concurrent,
            elapsed_ms,
            outcomes,
            subscription_check,
        })
    }

    fn tally(
        outcomes: &mut ReplayTally,
        result: Result<IngestOutcome, crate::domain::billing::WebhookError>,
    ) {
        match result {
            Ok(IngestOutcome::Processed { .. }) => outcomes.processed += 1,
            Ok(IngestOutcome::Duplicate { .. }) => outcomes.duplicates += 1,
            Ok(IngestOutcome::LateEvent { .. }) => outcomes.late += 1,
            Ok(IngestOutcome::IgnoredUnknownType { .. }) => outcomes.late += 1,
            Ok(IngestOutcome::Failed { .. }) | Err(_) => outcomes.failed += 1,
        }
    }
}
