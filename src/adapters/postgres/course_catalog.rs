//! PostgreSQL implementation of CourseCatalog.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CourseId, DomainError, ErrorCode, SubjectId};
use crate::ports::CourseCatalog;

/// PostgreSQL implementation of the CourseCatalog port.
pub struct PostgresCourseCatalog {
    pool: PgPool,
}

impl PostgresCourseCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseCatalog for PostgresCourseCatalog {
    async fn subject_ids(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<BTreeSet<SubjectId>>, DomainError> {
        // A course with no subjects is still a known course; the
        // existence check keeps the two cases apart.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to check course: {}", e),
                )
            })?;

        if !exists {
            return Ok(None);
        }

        let rows: Vec<Uuid> =
            sqlx::query_scalar("SELECT subject_id FROM course_subjects WHERE course_id = $1")
                .bind(course_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load course subjects: {}", e),
                    )
                })?;

        Ok(Some(
            rows.into_iter().map(SubjectId::from_uuid).collect(),
        ))
    }
}
