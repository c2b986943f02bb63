//! Webhook error types for payment gateway webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
///
/// A duplicate delivery is not represented here: the event store claim
/// reports `is_new: false` and the pipeline short-circuits without error.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload so malformed that no idempotency key can be derived.
    /// Nothing is stored; there is no key to store the record under.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Envelope parsed but a semantically required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event type the gateway sent is not one we process.
    /// Recorded as a no-op for forward compatibility.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Settlement amount does not reconcile against the invoice.
    /// Invoice state is left unchanged and a review note is appended.
    #[error("Amount mismatch: expected {expected_minor} minor units, got {actual_minor}")]
    AmountMismatch {
        expected_minor: i64,
        actual_minor: i64,
    },

    /// No invoice exists for the order referenced by the event.
    #[error("Invoice not found for order {0}")]
    InvoiceNotFound(String),

    /// Attempted invoice state transition is not valid.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Could not acquire the per-order processing lock within the wait bound.
    #[error("Lock timeout for order {0}")]
    LockTimeout(String),

    /// Subscription grant could not be activated after payment settled.
    /// The invoice stays PAID; financial state is never reversed.
    #[error("Activation failed: {0}")]
    FailedActivation(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Storage operation failed (Redis/cache).
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl WebhookError {
    /// Returns true if a re-delivery (replay or reconciler re-attempt)
    /// may succeed where this attempt failed.
    ///
    /// Retryable errors indicate temporary failures: infrastructure
    /// problems, lock contention, or eventual consistency with the
    /// upstream order record.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_)
                | WebhookError::StorageError(_)
                | WebhookError::LockTimeout(_)
                | WebhookError::InvoiceNotFound(_) // Might be eventual consistency
        )
    }

    /// Maps the error to the HTTP status the webhook endpoint answers with.
    ///
    /// The gateway treats non-2xx as "retry":
    /// - 401: signature-class rejection, nothing stored, retry will fail again
    /// - 400: unparseable envelope, nothing stored
    /// - 200: event stored; failure captured on the record instead
    /// - 5xx: infrastructure failure before the event could be stored
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - rejected at the boundary
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => StatusCode::UNAUTHORIZED,

            // No idempotency key derivable - nothing to store
            WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            // Captured on the stored event record; acknowledge so the
            // gateway stops redelivering a deterministic failure
            WebhookError::MissingField(_)
            | WebhookError::UnknownEventType(_)
            | WebhookError::AmountMismatch { .. }
            | WebhookError::InvoiceNotFound(_)
            | WebhookError::InvalidTransition(_)
            | WebhookError::LockTimeout(_)
            | WebhookError::FailedActivation(_) => StatusCode::OK,

            // Infrastructure errors - redelivery is safe and desired
            WebhookError::Database(_) | WebhookError::StorageError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
