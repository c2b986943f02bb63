//! In-memory course catalog.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{CourseId, DomainError, SubjectId};
use crate::ports::CourseCatalog;

/// In-memory implementation of `CourseCatalog`.
///
/// Courses are registered up front; tests mutate the subject set to
/// simulate catalog changes between activation and sync.
pub struct InMemoryCourseCatalog {
    courses: RwLock<HashMap<CourseId, BTreeSet<SubjectId>>>,
}

impl InMemoryCourseCatalog {
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
        }
    }

    /// Registers or replaces a course's subject set.
    pub fn set_subjects(&self, course_id: CourseId, subjects: BTreeSet<SubjectId>) {
        self.courses
            .write()
            .expect("InMemoryCourseCatalog: lock poisoned")
            .insert(course_id, subjects);
    }

    /// Removes a course entirely.
    pub fn remove_course(&self, course_id: &CourseId) {
        self.courses
            .write()
            .expect("InMemoryCourseCatalog: lock poisoned")
            .remove(course_id);
    }
}

impl Default for InMemoryCourseCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCourseCatalog {
    async fn subject_ids(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<BTreeSet<SubjectId>>, DomainError> {
        Ok(self
            .courses
            .read()
            .expect("InMemoryCourseCatalog: lock poisoned")
            .get(course_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn unknown_course_returns_none() {
        let catalog = InMemoryCourseCatalog::new();
        let result = catalog.subject_ids(&CourseId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn registered_course_returns_its_subjects() {
        let catalog = InMemoryCourseCatalog::new();
        let course_id = CourseId::new();
        let subjects: BTreeSet<_> = [SubjectId::from_uuid(Uuid::from_u128(1))].into();

        catalog.set_subjects(course_id, subjects.clone());

        let found = catalog.subject_ids(&course_id).await.unwrap();
        assert_eq!(found, Some(subjects));
    }
}
