//! PostgreSQL implementation of WebhookEventStore.
//!
//! The claim rides on the primary-key upsert: `ON CONFLICT DO UPDATE`
//! makes insert-or-bump one atomic statement, and `xmax = 0` tells the
//! two apart in the RETURNING row. Ownership is a conditional UPDATE
//! whose row count is the CAS verdict.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{ProcessingStatus, WebhookEvent};
use crate::domain::foundation::{DomainError, ErrorCode, EventId, OrderId, Timestamp};
use crate::ports::{ClaimOutcome, WebhookEventStore};

/// PostgreSQL implementation of the WebhookEventStore port.
pub struct PostgresWebhookEventStore {
    pool: PgPool,
}

impl PostgresWebhookEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a stored delivery.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    order_id: String,
    event_type: String,
    raw_payload: Vec<u8>,
    raw_headers: serde_json::Value,
    processing_status: String,
    processing_started_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    replay_count: i64,
    received_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEvent {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let processing_status: ProcessingStatus = row.processing_status.parse().map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid processing_status: {}", e),
            )
        })?;
        let raw_headers: HashMap<String, String> = serde_json::from_value(row.raw_headers)
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid raw_headers: {}", e),
                )
            })?;
        let order_id = OrderId::new(row.order_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid order_id: {}", e))
        })?;

        Ok(WebhookEvent {
            event_id: EventId::from_string(row.event_id),
            order_id,
            event_type: row.event_type,
            raw_payload: row.raw_payload,
            raw_headers,
            processing_status,
            processing_started_at: row.processing_started_at.map(Timestamp::from_datetime),
            error_message: row.error_message,
            replay_count: row.replay_count,
            received_at: Timestamp::from_datetime(row.received_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    event_id, order_id, event_type, raw_payload, raw_headers,
    processing_status, processing_started_at, error_message,
    replay_count, received_at, updated_at
"#;

#[async_trait]
impl WebhookEventStore for PostgresWebhookEventStore {
    async fn record_and_claim(&self, event: WebhookEvent) -> Result<ClaimOutcome, DomainError> {
        let headers = serde_json::to_value(&event.raw_headers).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to serialize headers: {}", e),
            )
        })?;

        // xmax = 0 only for a freshly inserted row; a conflict-update
        // carries the previous row's status untouched.
        let row: (bool, i64, String) = sqlx::query_as(
            r#"
            INSERT INTO webhook_events (
                event_id, order_id, event_type, raw_payload, raw_headers,
                processing_status, replay_count, received_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 1, NOW(), NOW())
            ON CONFLICT (event_id) DO UPDATE
                SET replay_count = webhook_events.replay_count + 1,
                    updated_at = NOW()
            RETURNING (xmax = 0) AS inserted, replay_count, processing_status
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(event.order_id.as_str())
        .bind(&event.event_type)
        .bind(&event.raw_payload)
        .bind(headers)
        .bind(ProcessingStatus::Stored.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record delivery: {}", e),
            )
        })?;

        let (inserted, replay_count, prior_status) = row;
        if inserted {
            return Ok(ClaimOutcome::Claimed);
        }

        let prior_status: ProcessingStatus = prior_status.parse().map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid processing_status: {}", e),
            )
        })?;
        Ok(ClaimOutcome::Duplicate {
            replay_count,
            prior_status,
        })
    }

    async fn begin_processing(
        &self,
        event_id: &EventId,
        stale_before: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status = 'PROCESSING',
                processing_started_at = NOW(),
                updated_at = NOW()
            WHERE event_id = $1
              AND (
                  processing_status IN ('STORED', 'FAILED')
                  OR (
                      processing_status = 'PROCESSING'
                      AND (processing_started_at IS NULL OR processing_started_at < $2)
                  )
              )
            "#,
        )
        .bind(event_id.as_str())
        .bind(stale_before.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to take processing ownership: {}", e),
            )
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status = 'PROCESSED',
                error_message = NULL,
                updated_at = NOW()
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark processed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EventNotFound,
                format!("No stored event {}", event_id),
            ));
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &EventId, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status = 'FAILED',
                error_message = $2,
                updated_at = NOW()
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark failed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EventNotFound,
                format!("No stored event {}", event_id),
            ));
        }
        Ok(())
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookEvent>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE event_id = $1",
            SELECT_COLUMNS
        ))
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load event: {}", e),
            )
        })?;

        row.map(WebhookEvent::try_from).transpose()
    }

    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<WebhookEvent>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE order_id = $1 ORDER BY received_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load latest event for order: {}", e),
            )
        })?;

        row.map(WebhookEvent::try_from).transpose()
    }

    async fn find_latest(&self) -> Result<Option<WebhookEvent>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events ORDER BY received_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load latest event: {}", e),
            )
        })?;

        row.map(WebhookEvent::try_from).transpose()
    }

    async fn find_stale_processing(
        &self,
        before: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookEvent>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM webhook_events
            WHERE processing_status = 'PROCESSING'
              AND (processing_started_at IS NULL OR processing_started_at < $1)
            ORDER BY processing_started_at ASC NULLS FIRST
            LIMIT $2
            "#,
            SELECT_COLUMNS
        ))
        .bind(before.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load stale events: {}", e),
            )
        })?;

        rows.into_iter().map(WebhookEvent::try_from).collect()
    }

    async fn purge_test_records(&self, order_prefix: &str) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE order_id LIKE $1 || '%'")
            .bind(order_prefix)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to purge test records: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
