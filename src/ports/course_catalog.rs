//! CourseCatalog port - read-only view of course contents.
//!
//! The catalog is owned elsewhere; activation and sync only need the
//! current subject set for a course, so the port is deliberately narrow.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::foundation::{CourseId, DomainError, SubjectId};

/// Read port for the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Current subject set for a course.
    ///
    /// `None` means the course is not in the catalog - a paid order for
    /// it becomes a FAILED_ACTIVATION grant rather than an error.
    async fn subject_ids(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<BTreeSet<SubjectId>>, DomainError>;
}
