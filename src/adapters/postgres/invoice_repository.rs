//! PostgreSQL implementation of InvoiceRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Invoice, InvoiceStatus};
use crate::domain::foundation::{
    CourseId, CurrencyCode, DomainError, ErrorCode, InvoiceId, Money, OrderId, Timestamp, UserId,
};
use crate::ports::{InvoiceRepository, ReviewNote};

/// PostgreSQL implementation of the InvoiceRepository port.
pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an invoice.
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    order_id: String,
    customer_id: String,
    course_id: Uuid,
    status: String,
    total_amount_minor: i64,
    amount_paid_minor: i64,
    currency: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let status: InvoiceStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
        })?;
        let currency = CurrencyCode::new(&row.currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let total_amount = Money::new(row.total_amount_minor, currency.clone()).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid total: {}", e))
        })?;
        let amount_paid = Money::new(row.amount_paid_minor, currency).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid amount paid: {}", e),
            )
        })?;

        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            order_id: OrderId::new(row.order_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid order_id: {}", e))
            })?,
            customer_id: UserId::new(row.customer_id).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid customer_id: {}", e),
                )
            })?,
            course_id: CourseId::from_uuid(row.course_id),
            status,
            total_amount,
            amount_paid,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a review note.
#[derive(Debug, sqlx::FromRow)]
struct ReviewNoteRow {
    id: Uuid,
    invoice_id: Uuid,
    order_id: String,
    kind: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewNoteRow> for ReviewNote {
    type Error = DomainError;

    fn try_from(row: ReviewNoteRow) -> Result<Self, Self::Error> {
        Ok(ReviewNote {
            id: row.id,
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            order_id: OrderId::new(row.order_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid order_id: {}", e))
            })?,
            kind: row.kind,
            message: row.message,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, order_id, customer_id, course_id, status,
                total_amount_minor, amount_paid_minor, currency,
                version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.order_id.as_str())
        .bind(invoice.customer_id.as_str())
        .bind(invoice.course_id.as_uuid())
        .bind(invoice.status.as_str())
        .bind(invoice.total_amount.amount_minor())
        .bind(invoice.amount_paid.amount_minor())
        .bind(invoice.total_amount.currency().as_str())
        .bind(invoice.version)
        .bind(invoice.created_at.as_datetime())
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("invoices_order_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!("Order {} already has an invoice", invoice.order_id),
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save invoice: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = $3,
                amount_paid_minor = $4,
                updated_at = $5,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.version)
        .bind(invoice.status.as_str())
        .bind(invoice.amount_paid.amount_minor())
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update invoice: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                format!("Invoice {} changed since it was read", invoice.id),
            ));
        }
        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &OrderId) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, customer_id, course_id, status,
                   total_amount_minor, amount_paid_minor, currency,
                   version, created_at, updated_at
            FROM invoices
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find invoice: {}", e),
            )
        })?;

        row.map(Invoice::try_from).transpose()
    }

    async fn append_review_note(&self, note: ReviewNote) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_review_notes (id, invoice_id, order_id, kind, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(note.id)
        .bind(note.invoice_id.as_uuid())
        .bind(note.order_id.as_str())
        .bind(&note.kind)
        .bind(&note.message)
        .bind(note.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to append review note: {}", e),
            )
        })?;

        Ok(())
    }

    async fn review_notes_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ReviewNote>, DomainError> {
        let rows: Vec<ReviewNoteRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, order_id, kind, message, created_at
            FROM invoice_review_notes
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load review notes: {}", e),
            )
        })?;

        rows.into_iter().map(ReviewNote::try_from).collect()
    }
}
