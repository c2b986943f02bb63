//! InvoiceRepository port - persistence for the invoice aggregate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::Invoice;
use crate::domain::foundation::{DomainError, InvoiceId, OrderId, Timestamp};

/// A manual-review flag attached to an order.
///
/// Appended when a delivery cannot be settled automatically (amount
/// mismatch, failed activation). Notes are never consumed by the
/// pipeline; they exist for operators.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewNote {
    pub id: Uuid,
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    /// Short machine-readable category, e.g. "AMOUNT_MISMATCH".
    pub kind: String,
    pub message: String,
    pub created_at: Timestamp,
}

impl ReviewNote {
    /// Creates a note for an order flagged during processing.
    pub fn flag(
        invoice_id: InvoiceId,
        order_id: OrderId,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            order_id,
            kind: kind.into(),
            message: message.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// Port for invoice persistence.
///
/// Implementations must enforce the one-invoice-per-order invariant and
/// use the aggregate's `version` for optimistic concurrency on update.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Persists a new invoice.
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// Persists changes to an existing invoice.
    ///
    /// Returns `VersionConflict` when the stored version does not match
    /// the aggregate's, which means another writer got there first.
    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// Loads the invoice for a gateway order, if one exists.
    async fn find_by_order_id(&self, order_id: &OrderId) -> Result<Option<Invoice>, DomainError>;

    /// Appends a manual-review note. Append-only.
    async fn append_review_note(&self, note: ReviewNote) -> Result<(), DomainError>;

    /// All review notes for an order, oldest first.
    async fn review_notes_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ReviewNote>, DomainError>;
}
