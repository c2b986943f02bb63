//! Subscription grant aggregate.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CourseId, OrderId, SubjectId, SubscriptionId, Timestamp, UserId, ValidationError,
};

use super::subject_diff::SubjectDiff;

/// Entitlement state of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    /// The user holds the course's subjects.
    Active,
    /// Payment settled but the grant could not be built (e.g. the course
    /// vanished from the catalog). Kept for operator review; carries no
    /// entitlements.
    FailedActivation,
}

impl GrantStatus {
    /// Database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Active => "ACTIVE",
            GrantStatus::FailedActivation => "FAILED_ACTIVATION",
        }
    }
}

impl FromStr for GrantStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(GrantStatus::Active),
            "FAILED_ACTIVATION" => Ok(GrantStatus::FailedActivation),
            other => Err(ValidationError::invalid_format(
                "grant_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One subscription grant.
///
/// # Invariants
///
/// - At most one grant per (user_id, order_id); the repository enforces
///   this with a unique constraint as the last line of defense.
/// - `subject_ids` is empty when the status is FAILED_ACTIVATION.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub course_id: CourseId,

    /// Subjects the grant entitles, snapshotted from the catalog at
    /// activation and refreshed by sync.
    pub subject_ids: BTreeSet<SubjectId>,

    pub status: GrantStatus,

    /// Optimistic concurrency version, bumped by the repository on save.
    pub version: i64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Builds an ACTIVE grant from the catalog's current subject set.
    pub fn activate(
        user_id: UserId,
        order_id: OrderId,
        course_id: CourseId,
        subject_ids: BTreeSet<SubjectId>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            order_id,
            course_id,
            subject_ids,
            status: GrantStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a FAILED_ACTIVATION placeholder with no entitlements.
    ///
    /// Recorded when payment settled but the grant could not be built, so
    /// the paid order stays visible to operators.
    pub fn failed_activation(user_id: UserId, order_id: OrderId, course_id: CourseId) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            order_id,
            course_id,
            subject_ids: BTreeSet::new(),
            status: GrantStatus::FailedActivation,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when the grant carries live entitlements.
    pub fn is_active(&self) -> bool {
        self.status == GrantStatus::Active
    }

    /// Replaces the subject set with the catalog's current one, returning
    /// the diff. A no-op diff leaves `updated_at` untouched.
    pub fn sync_subjects(&mut self, current: BTreeSet<SubjectId>) -> SubjectDiff {
        let diff = SubjectDiff::between(&self.subject_ids, &current);
        if !diff.is_empty() {
            self.subject_ids = current;
            self.updated_at = Timestamp::now();
        }
        diff
    }
}
