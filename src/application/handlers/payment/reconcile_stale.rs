//! ReconcileStaleHandler - adopts events abandoned by crashed workers.
//!
//! A worker that dies between `begin_processing` and its terminal mark
//! leaves the event PROCESSING forever. The reconciler sweeps for such
//! records past the grace window and pushes each back through the
//! regular pipeline, where the ownership CAS prevents two sweepers (or a
//! sweeper and a live retry) from adopting the same event.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::WebhookEventStore;

use super::ingest_webhook::{IngestOutcome, IngestWebhookHandler};

/// One sweep's result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileReport {
    /// Stale events the sweep found.
    pub found: u32,
    /// Events this sweep adopted and drove to a terminal state.
    pub reattempted: u32,
    /// Events that failed again; they stay FAILED for the next sweep or
    /// for manual replay.
    pub failed_again: u32,
}

/// Handler that re-attempts stale PROCESSING events.
pub struct ReconcileStaleHandler {
    event_store: Arc<dyn WebhookEventStore>,
    ingest: Arc<IngestWebhookHandler>,
    /// Silence threshold before a PROCESSING owner is presumed dead.
    stale_grace_secs: u64,
    /// Cap per sweep so one pathological backlog cannot starve the loop.
    batch_limit: u32,
}

impl ReconcileStaleHandler {
    pub fn new(
        event_store: Arc<dyn WebhookEventStore>,
        ingest: Arc<IngestWebhookHandler>,
        stale_grace_secs: u64,
        batch_limit: u32,
    ) -> Self {
        Self {
            event_store,
            ingest,
            stale_grace_secs,
            batch_limit,
        }
    }

    /// Runs one sweep.
    pub async fn handle(&self) -> Result<ReconcileReport, DomainError> {
        let stale_before = Timestamp::now().minus_secs(self.stale_grace_secs);
        let stale = self
            .event_store
            .find_stale_processing(stale_before, self.batch_limit)
            .await?;

        let mut report = ReconcileReport {
            found: stale.len() as u32,
            ..Default::default()
        };
        if stale.is_empty() {
            return Ok(report);
        }

        info!(count = stale.len(), "Reconciling stale deliveries");

        for event in stale {
            let notification = match event.notification() {
                Ok(notification) => notification,
                Err(e) => {
                    // Unreparseable capture; park it as FAILED so it stops
                    // matching the stale sweep.
                    warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Stale event payload no longer parses"
                    );
                    self.event_store
                        .mark_failed(&event.event_id, &e.to_string())
                        .await?;
                    report.failed_again += 1;
                    continue;
                }
            };

            match self
                .ingest
                .process_delivery(notification, event.raw_payload.clone(), event.raw_headers.clone())
                .await
            {
                Ok(IngestOutcome::Failed { error }) => {
                    warn!(
                        event_id = %event.event_id,
                        error = %error,
                        "Re-attempt failed again"
                    );
                    report.failed_again += 1;
                }
                Ok(_) => report.reattempted += 1,
                Err(e) => {
                    warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Re-attempt could not run"
                    );
                    report.failed_again += 1;
                }
            }
        }

        Ok(report)
    }
}
