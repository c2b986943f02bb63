//! ActivateOrderHandler - exactly-once subscription activation for a paid order.
//!
//! Three independent layers guarantee a paid order activates at most one
//! grant, in order of engagement:
//!
//! 1. the per-order lock serializes concurrent activators
//! 2. the read-after-lock duplicate check short-circuits a grant that
//!    already exists
//! 3. the repository's unique (user, order) constraint catches any writer
//!    that slipped past both

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::WebhookError;
use crate::domain::enrollment::{ActivationFailed, Subscription, SubscriptionActivated};
use crate::domain::foundation::{
    CourseId, EventId, OrderId, SerializableDomainEvent, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{
    CourseCatalog, EventPublisher, InvoiceRepository, ProcessingLock, ReviewNote, SaveOutcome,
    SubscriptionRepository,
};

/// Command to activate the grant for a settled order.
#[derive(Debug, Clone)]
pub struct ActivateOrderCommand {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub course_id: CourseId,
}

/// Result of an activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// A new ACTIVE grant was created and announced.
    Activated { subscription_id: SubscriptionId },
    /// A grant for this (user, order) already existed; nothing changed
    /// and nothing was published.
    AlreadyActive { subscription_id: SubscriptionId },
    /// The grant could not be built; a FAILED_ACTIVATION placeholder was
    /// recorded for operator review. The invoice stays PAID.
    FailedActivation {
        subscription_id: SubscriptionId,
        reason: String,
    },
}

/// Handler that converts a settled order into a subscription grant.
pub struct ActivateOrderHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CourseCatalog>,
    invoices: Arc<dyn InvoiceRepository>,
    locks: Arc<dyn ProcessingLock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ActivateOrderHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CourseCatalog>,
        invoices: Arc<dyn InvoiceRepository>,
        locks: Arc<dyn ProcessingLock>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            invoices,
            locks,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ActivateOrderCommand,
    ) -> Result<ActivationOutcome, WebhookError> {
        // 1. Serialize on the order. Bounded wait; contention past the
        // bound is a retryable failure, not a queue.
        let _guard = self
            .locks
            .acquire(cmd.order_id.as_str())
            .await
            .map_err(|_| WebhookError::LockTimeout(cmd.order_id.to_string()))?;

        // 2. Duplicate check under the lock. A grant recorded by an
        // earlier delivery, whatever its status, ends the attempt here.
        if let Some(existing) = self
            .subscriptions
            .find_by_user_and_order(&cmd.user_id, &cmd.order_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            info!(
                order_id = %cmd.order_id,
                subscription_id = %existing.id,
                "Order already has a grant, skipping activation"
            );
            return Ok(ActivationOutcome::AlreadyActive {
                subscription_id: existing.id,
            });
        }

        // 3. Snapshot the course's subjects.
        let subjects = self
            .catalog
            .subject_ids(&cmd.course_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?;

        let Some(subjects) = subjects else {
            return self.record_failed_activation(&cmd, "course not in catalog").await;
        };

        // 4. Persist the grant. The unique constraint turns a lost race
        // into AlreadyActive instead of a duplicate.
        let grant = Subscription::activate(
            cmd.user_id.clone(),
            cmd.order_id.clone(),
            cmd.course_id,
            subjects,
        );

        match self
            .subscriptions
            .save(&grant)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            SaveOutcome::Created => {}
            SaveOutcome::AlreadyExists => {
                let existing = self
                    .subscriptions
                    .find_by_user_and_order(&cmd.user_id, &cmd.order_id)
                    .await
                    .map_err(|e| WebhookError::Database(e.to_string()))?
                    .ok_or_else(|| {
                        WebhookError::Database(format!(
                            "grant for order {} vanished after unique-constraint hit",
                            cmd.order_id
                        ))
                    })?;
                return Ok(ActivationOutcome::AlreadyActive {
                    subscription_id: existing.id,
                });
            }
        }

        // 5. Announce only after the write landed.
        let event = SubscriptionActivated {
            event_id: EventId::new(),
            subscription_id: grant.id,
            user_id: grant.user_id.clone(),
            order_id: grant.order_id.clone(),
            course_id: grant.course_id,
            subject_ids: grant.subject_ids.clone(),
            occurred_at: Timestamp::now(),
        };
        self.event_publisher
            .publish(event.to_envelope())
            .await
            .map_err(|e| WebhookError::StorageError(e.to_string()))?;

        info!(
            order_id = %cmd.order_id,
            subscription_id = %grant.id,
            subjects = grant.subject_ids.len(),
            "Subscription activated"
        );

        Ok(ActivationOutcome::Activated {
            subscription_id: grant.id,
        })
    }

    /// Records a FAILED_ACTIVATION placeholder plus a review note so the
    /// paid order stays visible to operators. Financial state is never
    /// reversed here.
    async fn record_failed_activation(
        &self,
        cmd: &ActivateOrderCommand,
        reason: &str,
    ) -> Result<ActivationOutcome, WebhookError> {
        warn!(
            order_id = %cmd.order_id,
            course_id = %cmd.course_id,
            reason,
            "Activation failed, recording placeholder grant"
        );

        let grant = Subscription::failed_activation(
            cmd.user_id.clone(),
            cmd.order_id.clone(),
            cmd.course_id,
        );

        match self
            .subscriptions
            .save(&grant)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            SaveOutcome::Created => {}
            SaveOutcome::AlreadyExists => {
                let existing = self
                    .subscriptions
                    .find_by_user_and_order(&cmd.user_id, &cmd.order_id)
                    .await
                    .map_err(|e| WebhookError::Database(e.to_string()))?;
                if let Some(existing) = existing {
                    return Ok(ActivationOutcome::AlreadyActive {
                        subscription_id: existing.id,
                    });
                }
            }
        }

        if let Some(invoice) = self
            .invoices
            .find_by_order_id(&cmd.order_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            self.invoices
                .append_review_note(ReviewNote::flag(
                    invoice.id,
                    cmd.order_id.clone(),
                    "FAILED_ACTIVATION",
                    reason,
                ))
                .await
                .map_err(|e| WebhookError::Database(e.to_string()))?;
        }

        let event = ActivationFailed {
            event_id: EventId::new(),
            subscription_id: grant.id,
            user_id: grant.user_id.clone(),
            order_id: grant.order_id.clone(),
            course_id: grant.course_id,
            reason: reason.to_string(),
            occurred_at: Timestamp::now(),
        };
        self.event_publisher
            .publish(event.to_envelope())
            .await
            .map_err(|e| WebhookError::StorageError(e.to_string()))?;

        Ok(ActivationOutcome::FailedActivation {
            subscription_id: grant.id,
            reason: reason.to_string(),
        })
    }
}
