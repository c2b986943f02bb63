//! In-memory invoice repository.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::billing::Invoice;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::ports::{InvoiceRepository, ReviewNote};

/// In-memory implementation of `InvoiceRepository`.
///
/// Keyed by order id, which also enforces the one-invoice-per-order
/// invariant. Updates use the same optimistic version check the
/// Postgres adapter performs.
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<OrderId, Invoice>>,
    notes: RwLock<Vec<ReviewNote>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self {
            invoices: RwLock::new(HashMap::new()),
            notes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryInvoiceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self
            .invoices
            .write()
            .expect("InMemoryInvoiceRepository: lock poisoned");
        if invoices.contains_key(&invoice.order_id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invoice for order {} already exists", invoice.order_id),
            ));
        }
        invoices.insert(invoice.order_id.clone(), invoice.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self
            .invoices
            .write()
            .expect("InMemoryInvoiceRepository: lock poisoned");
        let stored = invoices.get_mut(&invoice.order_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvoiceNotFound,
                format!("No invoice for order {}", invoice.order_id),
            )
        })?;
        if stored.version != invoice.version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                format!(
                    "Invoice version {} does not match stored {}",
                    invoice.version, stored.version
                ),
            ));
        }
        let mut updated = invoice.clone();
        updated.version += 1;
        *stored = updated;
        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &OrderId) -> Result<Option<Invoice>, DomainError> {
        Ok(self
            .invoices
            .read()
            .expect("InMemoryInvoiceRepository: lock poisoned")
            .get(order_id)
            .cloned())
    }

    async fn append_review_note(&self, note: ReviewNote) -> Result<(), DomainError> {
        self.notes
            .write()
            .expect("InMemoryInvoiceRepository: notes lock poisoned")
            .push(note);
        Ok(())
    }

    async fn review_notes_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ReviewNote>, DomainError> {
        Ok(self
            .notes
            .read()
            .expect("InMemoryInvoiceRepository: notes lock poisoned")
            .iter()
            .filter(|n| &n.order_id == order_id)
            .cloned()
            .collect())
    }
}
