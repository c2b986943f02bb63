//! Stored webhook delivery records.
//!
//! Every logical gateway delivery that passes signature verification is
//! persisted as a `WebhookEvent` before any processing happens. The record
//! is the audit trail, the idempotency anchor and the replay source: it is
//! never deleted in normal operation.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, OrderId, Timestamp, ValidationError};

use super::gateway_event::GatewayNotification;
use super::webhook_errors::WebhookError;

/// Processing lifecycle of a stored delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Persisted, no worker has taken ownership yet.
    Stored,
    /// A worker owns it; `processing_started_at` records since when.
    Processing,
    /// Fully handled. Terminal for normal operation.
    Processed,
    /// Handling failed; `error_message` records why. Replayable.
    Failed,
}

impl ProcessingStatus {
    /// Database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Stored => "STORED",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Processed => "PROCESSED",
            ProcessingStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STORED" => Ok(ProcessingStatus::Stored),
            "PROCESSING" => Ok(ProcessingStatus::Processing),
            "PROCESSED" => Ok(ProcessingStatus::Processed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "processing_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stored gateway delivery.
///
/// # Invariants
///
/// - `event_id` is unique; concurrent duplicate deliveries collide on it
///   and only increment `replay_count`.
/// - `replay_count` starts at 1 on first receipt.
/// - `raw_payload` and `raw_headers` are byte-exact captures; replay
///   rebuilds the original delivery from them.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Deterministic idempotency key for the logical delivery.
    pub event_id: EventId,

    /// Gateway order this delivery settles against.
    pub order_id: OrderId,

    /// Raw gateway event type string.
    pub event_type: String,

    /// Byte-exact copy of the request body.
    pub raw_payload: Vec<u8>,

    /// Captured request headers.
    pub raw_headers: HashMap<String, String>,

    /// Where the delivery is in its processing lifecycle.
    pub processing_status: ProcessingStatus,

    /// When the owning worker started processing, if any.
    pub processing_started_at: Option<Timestamp>,

    /// Failure detail when `processing_status` is FAILED.
    pub error_message: Option<String>,

    /// Number of times this logical delivery has been received.
    pub replay_count: i64,

    /// First receipt time.
    pub received_at: Timestamp,

    /// Last change to this record.
    pub updated_at: Timestamp,
}

impl WebhookEvent {
    /// Builds the record for a freshly received delivery.
    pub fn received(
        event_id: EventId,
        order_id: OrderId,
        event_type: impl Into<String>,
        raw_payload: Vec<u8>,
        raw_headers: HashMap<String, String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            event_id,
            order_id,
            event_type: event_type.into(),
            raw_payload,
            raw_headers,
            processing_status: ProcessingStatus::Stored,
            processing_started_at: None,
            error_message: None,
            replay_count: 1,
            received_at: now,
            updated_at: now,
        }
    }

    /// Re-parses the captured payload into a notification.
    ///
    /// The replay harness and reconciler re-enter processing from the
    /// stored bytes; the signature was already validated at capture time.
    pub fn notification(&self) -> Result<GatewayNotification, WebhookError> {
        GatewayNotification::parse(&self.raw_payload)
    }

    /// Returns true if a re-attempt may take ownership of this record:
    /// FAILED and never-started STORED records always qualify, and a
    /// PROCESSING record qualifies once its owner has been silent since
    /// before `stale_before` (presumed crashed).
    pub fn eligible_for_reattempt(&self, stale_before: Timestamp) -> bool {
        match self.processing_status {
            ProcessingStatus::Stored | ProcessingStatus::Failed => true,
            ProcessingStatus::Processing => self
                .processing_started_at
                .map(|started| started.is_before(&stale_before))
                .unwrap_or(true),
            ProcessingStatus::Processed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> WebhookEvent {
        WebhookEvent::received(
            EventId::from_string("ORD-100:PAYMENT_SUCCESS"),
            OrderId::new("ORD-100").unwrap(),
            "PAYMENT_SUCCESS",
            br#"{"eventType":"PAYMENT_SUCCESS","orderId":"ORD-100","amount":1000}"#.to_vec(),
            HashMap::new(),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // ProcessingStatus Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_as_str_round_trips() {
        for status in [
            ProcessingStatus::Stored,
            ProcessingStatus::Processing,
            ProcessingStatus::Processed,
            ProcessingStatus::Failed,
        ] {
            let parsed: ProcessingStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_from_str_rejects_unknown() {
        let result: Result<ProcessingStatus, _> = "QUEUED".parse();
        assert!(result.is_err());
    }

    #[test]
    fn status_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ProcessingStatus::Processing).unwrap();
        assert_eq!(json, r#""PROCESSING""#);
    }

    // ══════════════════════════════════════════════════════════════
    // WebhookEvent Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn received_starts_stored_with_replay_count_one() {
        let event = sample_event();

        assert_eq!(event.processing_status, ProcessingStatus::Stored);
        assert_eq!(event.replay_count, 1);
        assert!(event.processing_started_at.is_none());
        assert!(event.error_message.is_none());
    }

    #[test]
    fn notification_reparses_captured_payload() {
        let event = sample_event();

        let notification = event.notification().unwrap();
        assert_eq!(notification.order_id, "ORD-100");
        assert_eq!(notification.amount, Some(1000));
    }

    #[test]
    fn notification_fails_for_corrupt_payload() {
        let mut event = sample_event();
        event.raw_payload = b"garbage".to_vec();

        assert!(matches!(
            event.notification(),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Re-attempt Eligibility Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn stored_is_eligible_for_reattempt() {
        let event = sample_event();
        assert!(event.eligible_for_reattempt(Timestamp::now()));
    }

    #[test]
    fn failed_is_eligible_for_reattempt() {
        let mut event = sample_event();
        event.processing_status = ProcessingStatus::Failed;
        event.error_message = Some("lock timeout".to_string());

        assert!(event.eligible_for_reattempt(Timestamp::now()));
    }

    #[test]
    fn processed_is_never_eligible() {
        let mut event = sample_event();
        event.processing_status = ProcessingStatus::Processed;

        assert!(!event.eligible_for_reattempt(Timestamp::now()));
    }

    #[test]
    fn fresh_processing_is_not_eligible() {
        let mut event = sample_event();
        event.processing_status = ProcessingStatus::Processing;
        event.processing_started_at = Some(Timestamp::now());

        let stale_before = Timestamp::now().minus_secs(300);
        assert!(!event.eligible_for_reattempt(stale_before));
    }

    #[test]
    fn stale_processing_is_eligible() {
        let mut event = sample_event();
        event.processing_status = ProcessingStatus::Processing;
        event.processing_started_at = Some(Timestamp::now().minus_secs(600));

        let stale_before = Timestamp::now().minus_secs(300);
        assert!(event.eligible_for_reattempt(stale_before));
    }

    #[test]
    fn processing_without_start_time_is_eligible() {
        // Inconsistent record, an owner that never stamped its start
        let mut event = sample_event();
        event.processing_status = ProcessingStatus::Processing;
        event.processing_started_at = None;

        assert!(event.eligible_for_reattempt(Timestamp::now().minus_secs(300)));
    }
}
