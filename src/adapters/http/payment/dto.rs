//! HTTP DTOs (Data Transfer Objects) for payment endpoints.
//!
//! These types define the JSON request/response structure for the
//! payment API. They serve as the boundary between HTTP and the
//! application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::{IngestOutcome, OrderStatusView, ReplayStormReport};
use crate::domain::billing::Invoice;
use crate::domain::enrollment::Subscription;
use crate::ports::ReviewNote;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to storm-replay a stored delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStormRequest {
    /// Order whose latest delivery to replay; latest overall when absent.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Number of replays to fire.
    pub replay_count: u32,
    /// Fire all replays simultaneously instead of one after another.
    #[serde(default)]
    pub concurrent: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement of a webhook delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAckResponse {
    /// What the pipeline did with the delivery.
    pub outcome: String,
    /// Order the delivery referenced, when it got far enough to know.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Invoice status after processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_status: Option<String>,
    /// How many times this delivery has been seen, for duplicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_count: Option<i64>,
    /// Captured failure, for deterministic errors acknowledged with 200.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<IngestOutcome> for WebhookAckResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Processed {
                order_id,
                new_status,
                ..
            } => Self {
                outcome: "processed".to_string(),
                order_id: Some(order_id.to_string()),
                invoice_status: Some(new_status.as_str().to_string()),
                replay_count: None,
                error: None,
            },
            IngestOutcome::Duplicate {
                replay_count,
                prior_status: _,
            } => Self {
                outcome: "duplicate".to_string(),
                order_id: None,
                invoice_status: None,
                replay_count: Some(replay_count),
                error: None,
            },
            IngestOutcome::IgnoredUnknownType { event_type } => Self {
                outcome: "ignored".to_string(),
                order_id: None,
                invoice_status: None,
                replay_count: None,
                error: Some(format!("unknown event type {}", event_type)),
            },
            IngestOutcome::LateEvent { status } => Self {
                outcome: "late".to_string(),
                order_id: None,
                invoice_status: Some(status.as_str().to_string()),
                replay_count: None,
                error: None,
            },
            IngestOutcome::Failed { error } => Self {
                outcome: "failed".to_string(),
                order_id: None,
                invoice_status: None,
                replay_count: None,
                error: Some(error),
            },
        }
    }
}

/// Invoice details for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub course_id: String,
    pub status: String,
    pub total_amount_minor: i64,
    pub amount_paid_minor: i64,
    pub outstanding_minor: i64,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            order_id: invoice.order_id.to_string(),
            customer_id: invoice.customer_id.to_string(),
            course_id: invoice.course_id.to_string(),
            status: invoice.status.as_str().to_string(),
            total_amount_minor: invoice.total_amount.amount_minor(),
            amount_paid_minor: invoice.amount_paid.amount_minor(),
            outstanding_minor: invoice.outstanding_minor(),
            currency: invoice.total_amount.currency().to_string(),
            created_at: invoice.created_at.as_datetime().to_rfc3339(),
            updated_at: invoice.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Subscription grant details for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    pub order_id: String,
    pub course_id: String,
    pub subject_ids: Vec<String>,
    pub status: String,
    pub created_at: String,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            order_id: subscription.order_id.to_string(),
            course_id: subscription.course_id.to_string(),
            subject_ids: subscription
                .subject_ids
                .iter()
                .map(|s| s.to_string())
                .collect(),
            status: subscription.status.as_str().to_string(),
            created_at: subscription.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Review note for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNoteResponse {
    pub id: String,
    pub kind: String,
    pub message: String,
    pub created_at: String,
}

impl From<&ReviewNote> for ReviewNoteResponse {
    fn from(note: &ReviewNote) -> Self {
        Self {
            id: note.id.to_string(),
            kind: note.kind.clone(),
            message: note.message.clone(),
            created_at: note.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Full order status view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub invoice: InvoiceResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionResponse>,
    pub review_notes: Vec<ReviewNoteResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_delivery_status: Option<String>,
}

impl From<OrderStatusView> for OrderStatusResponse {
    fn from(view: OrderStatusView) -> Self {
        Self {
            invoice: InvoiceResponse::from(&view.invoice),
            subscription: view.subscription.as_ref().map(SubscriptionResponse::from),
            review_notes: view
                .review_notes
                .iter()
                .map(ReviewNoteResponse::from)
                .collect(),
            latest_delivery_status: view
                .latest_delivery_status
                .map(|s| s.as_str().to_string()),
        }
    }
}

/// Replay storm report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStormResponse {
    pub event_id: String,
    pub concurrent: bool,
    pub elapsed_ms: u64,
    pub replay_count: u32,
    pub processed: u32,
    pub duplicates: u32,
    pub late: u32,
    pub failed: u32,
    pub subscription_check: SubscriptionCheckResponse,
}

/// Post-storm verdict on the one-grant invariant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCheckResponse {
    pub order_id: String,
    pub subscription_count: u64,
    pub passed: bool,
}

impl From<ReplayStormReport> for ReplayStormResponse {
    fn from(report: ReplayStormReport) -> Self {
        Self {
            event_id: report.event_id.as_str().to_string(),
            concurrent: report.concurrent,
            elapsed_ms: report.elapsed_ms,
            replay_count: report.replays,
            processed: report.outcomes.processed,
            duplicates: report.outcomes.duplicates,
            late: report.outcomes.late,
            failed: report.outcomes.failed,
            subscription_check: SubscriptionCheckResponse {
                order_id: report.order_id.to_string(),
                subscription_count: report.subscription_check.count,
                passed: report.subscription_check.passed,
            },
        }
    }
}

/// Result of purging test-marked deliveries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    /// Number of delivery records removed.
    pub removed: u64,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
