//! PostgreSQL implementation of SubscriptionRepository.
//!
//! The unique (user_id, order_id) index backs the exactly-once
//! guarantee: a duplicate insert surfaces as `SaveOutcome::AlreadyExists`
//! instead of an error, mirroring how the activation engine treats a
//! lost race.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::enrollment::{GrantStatus, Subscription};
use crate::domain::foundation::{
    CourseId, DomainError, ErrorCode, OrderId, SubjectId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{SaveOutcome, SubscriptionRepository};

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription grant.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    order_id: String,
    course_id: Uuid,
    subject_ids: serde_json::Value,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: GrantStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
        })?;
        let subject_ids: BTreeSet<SubjectId> = serde_json::from_value(row.subject_ids)
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid subject_ids: {}", e),
                )
            })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            order_id: OrderId::new(row.order_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid order_id: {}", e))
            })?,
            course_id: CourseId::from_uuid(row.course_id),
            subject_ids,
            status,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn subjects_json(subscription: &Subscription) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(&subscription.subject_ids).map_err(|e| {
        DomainError::new(
            ErrorCode::SerializationError,
            format!("Failed to serialize subject_ids: {}", e),
        )
    })
}

const SELECT_COLUMNS: &str = r#"
    id, user_id, order_id, course_id, subject_ids,
    status, version, created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<SaveOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, order_id, course_id, subject_ids,
                status, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.order_id.as_str())
        .bind(subscription.course_id.as_uuid())
        .bind(subjects_json(subscription)?)
        .bind(subscription.status.as_str())
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(SaveOutcome::Created),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("subscriptions_user_id_order_id_key") =>
            {
                Ok(SaveOutcome::AlreadyExists)
            }
            Err(e) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save subscription: {}", e),
            )),
        }
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                subject_ids = $3,
                status = $4,
                updated_at = $5,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.version)
        .bind(subjects_json(subscription)?)
        .bind(subscription.status.as_str())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                format!("Subscription {} changed since it was read", subscription.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_user_and_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 AND order_id = $2",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_active_by_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE course_id = $1 AND status = 'ACTIVE'",
            SELECT_COLUMNS
        ))
        .bind(course_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list subscriptions: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn count_by_order(&self, order_id: &OrderId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE order_id = $1")
            .bind(order_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to count subscriptions: {}", e),
                )
            })?;

        Ok(count as u64)
    }
}
