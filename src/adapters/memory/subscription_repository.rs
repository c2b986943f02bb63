//! In-memory subscription grant repository.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::enrollment::Subscription;
use crate::domain::foundation::{CourseId, DomainError, ErrorCode, OrderId, SubscriptionId, UserId};
use crate::ports::{SaveOutcome, SubscriptionRepository};

/// In-memory implementation of `SubscriptionRepository`.
///
/// The scan-then-insert in `save` happens under one write lock, which
/// gives the same atomicity the Postgres adapter gets from its unique
/// (user_id, order_id) constraint.
pub struct InMemorySubscriptionRepository {
    grants: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<SaveOutcome, DomainError> {
        let mut grants = self
            .grants
            .write()
            .expect("InMemorySubscriptionRepository: lock poisoned");

        let collision = grants.values().any(|g| {
            g.user_id == subscription.user_id && g.order_id == subscription.order_id
        });
        if collision {
            return Ok(SaveOutcome::AlreadyExists);
        }

        grants.insert(subscription.id, subscription.clone());
        Ok(SaveOutcome::Created)
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut grants = self
            .grants
            .write()
            .expect("InMemorySubscriptionRepository: lock poisoned");
        let stored = grants.get_mut(&subscription.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription {}", subscription.id),
            )
        })?;
        if stored.version != subscription.version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                format!(
                    "Subscription version {} does not match stored {}",
                    subscription.version, stored.version
                ),
            ));
        }
        let mut updated = subscription.clone();
        updated.version += 1;
        *stored = updated;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .grants
            .read()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .get(id)
            .cloned())
    }

    async fn find_by_user_and_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .grants
            .read()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .values()
            .find(|g| &g.user_id == user_id && &g.order_id == order_id)
            .cloned())
    }

    async fn find_active_by_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .grants
            .read()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .values()
            .filter(|g| &g.course_id == course_id && g.is_active())
            .cloned()
            .collect())
    }

    async fn count_by_order(&self, order_id: &OrderId) -> Result<u64, DomainError> {
        Ok(self
            .grants
            .read()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .values()
            .filter(|g| &g.order_id == order_id)
            .count() as u64)
    }
}
