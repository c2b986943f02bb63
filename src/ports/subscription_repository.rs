//! SubscriptionRepository port - persistence for subscription grants.

use async_trait::async_trait;

use crate::domain::enrollment::Subscription;
use crate::domain::foundation::{CourseId, DomainError, OrderId, SubscriptionId, UserId};

/// Result of persisting a new grant.
///
/// The unique constraint on (user_id, order_id) is the last line of
/// defense behind the per-order lock: a concurrent writer that slips
/// past the lock loses here instead of duplicating the grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The grant was inserted.
    Created,
    /// A grant for this (user, order) already existed; nothing was written.
    AlreadyExists,
}

/// Port for subscription grant persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Persists a new grant, reporting a (user, order) collision instead
    /// of erroring.
    async fn save(&self, subscription: &Subscription) -> Result<SaveOutcome, DomainError>;

    /// Persists changes to an existing grant with optimistic concurrency
    /// on `version`.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Loads one grant by id.
    async fn find_by_id(&self, id: &SubscriptionId)
        -> Result<Option<Subscription>, DomainError>;

    /// Loads the grant for a (user, order) pair, if any.
    async fn find_by_user_and_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All ACTIVE grants referencing a course. Feed for course-wide sync.
    async fn find_active_by_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Number of grants recorded against an order, any status.
    ///
    /// The replay harness verifies exactly-once activation with this.
    async fn count_by_order(&self, order_id: &OrderId) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SubscriptionRepository) {}

    #[test]
    fn save_outcome_variants_are_distinct() {
        assert_ne!(SaveOutcome::Created, SaveOutcome::AlreadyExists);
    }
}
