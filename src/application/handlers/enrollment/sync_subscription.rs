//! SyncSubscriptionHandler - keeps grants aligned with the catalog.
//!
//! A grant snapshots the course's subjects at activation; the catalog
//! keeps moving afterwards. Sync recomputes the diff and applies it,
//! either for one grant (manual refresh) or for every active grant on a
//! course (after a catalog change).

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::enrollment::{SubjectDiff, SubscriptionSynced};
use crate::domain::foundation::{
    CourseId, DomainError, ErrorCode, EventId, SerializableDomainEvent, SubscriptionId, Timestamp,
};
use crate::ports::{CourseCatalog, EventPublisher, SubscriptionRepository};

/// Result of refreshing one grant.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub subscription_id: SubscriptionId,
    /// Diff that was applied; empty when the grant already matched.
    pub diff: SubjectDiff,
}

impl RefreshOutcome {
    pub fn has_changes(&self) -> bool {
        !self.diff.is_empty()
    }
}

/// Read-only answer to "would a sync change anything?".
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub subscription_id: SubscriptionId,
    pub in_sync: bool,
    pub pending: SubjectDiff,
}

/// Result of syncing every active grant on a course.
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseRefreshReport {
    /// Active grants examined.
    pub examined: u32,
    /// Grants that actually changed.
    pub updated: u32,
}

/// Handler for subscription-catalog synchronization.
pub struct SyncSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CourseCatalog>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SyncSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CourseCatalog>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            event_publisher,
        }
    }

    /// Applies the catalog's current subject set to one grant.
    pub async fn refresh(&self, id: &SubscriptionId) -> Result<RefreshOutcome, DomainError> {
        let mut grant = self.load(id).await?;

        let current = self
            .catalog
            .subject_ids(&grant.course_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CourseNotFound,
                    format!("Course {} is no longer in the catalog", grant.course_id),
                )
            })?;

        let diff = grant.sync_subjects(current);
        if diff.is_empty() {
            return Ok(RefreshOutcome {
                subscription_id: *id,
                diff,
            });
        }

        self.subscriptions.update(&grant).await?;

        let event = SubscriptionSynced {
            event_id: EventId::new(),
            subscription_id: grant.id,
            user_id: grant.user_id.clone(),
            course_id: grant.course_id,
            added: diff.added.clone(),
            removed: diff.removed.clone(),
            occurred_at: Timestamp::now(),
        };
        self.event_publisher.publish(event.to_envelope()).await?;

        info!(
            subscription_id = %grant.id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Subscription synced with catalog"
        );

        Ok(RefreshOutcome {
            subscription_id: *id,
            diff,
        })
    }

    /// Reports what a refresh would change, without writing anything.
    pub async fn sync_status(&self, id: &SubscriptionId) -> Result<SyncStatus, DomainError> {
        let grant = self.load(id).await?;

        let current = self
            .catalog
            .subject_ids(&grant.course_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CourseNotFound,
                    format!("Course {} is no longer in the catalog", grant.course_id),
                )
            })?;

        let pending = SubjectDiff::between(&grant.subject_ids, &current);
        Ok(SyncStatus {
            subscription_id: *id,
            in_sync: pending.is_empty(),
            pending,
        })
    }

    /// Refreshes every ACTIVE grant on a course. FAILED_ACTIVATION
    /// placeholders carry no entitlements and are skipped.
    pub async fn refresh_course(&self, course_id: &CourseId) -> Result<CourseRefreshReport, DomainError> {
        let grants = self.subscriptions.find_active_by_course(course_id).await?;

        let mut report = CourseRefreshReport {
            examined: grants.len() as u32,
            ..Default::default()
        };

        for grant in grants {
            match self.refresh(&grant.id).await {
                Ok(outcome) if outcome.has_changes() => report.updated += 1,
                Ok(_) => {}
                Err(e) => {
                    // One bad grant must not abort the course-wide sweep.
                    warn!(
                        subscription_id = %grant.id,
                        error = %e,
                        "Grant refresh failed during course sync"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn load(
        &self,
        id: &SubscriptionId,
    ) -> Result<crate::domain::enrollment::Subscription, DomainError> {
        self.subscriptions.find_by_id(id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription {}", id),
            )
        })
    }
}
