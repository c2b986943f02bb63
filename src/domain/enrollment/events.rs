//! Domain events emitted by the activation and sync flows.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CourseId, EventId, OrderId, SubjectId, SubscriptionId, Timestamp, UserId,
};
use crate::domain_event;

/// A paid order was converted into an ACTIVE grant.
///
/// Published exactly once per (user, order): the activation engine's
/// per-order lock and the repository's unique constraint both guard the
/// write this event reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionActivated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub course_id: CourseId,
    pub subject_ids: BTreeSet<SubjectId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionActivated,
    event_type = "enrollment.subscription_activated.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

/// Payment settled but the grant could not be activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationFailed {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub course_id: CourseId,
    pub reason: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    ActivationFailed,
    event_type = "enrollment.activation_failed.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A sync brought a grant's subject set up to date with the catalog.
///
/// Only published when the diff is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSynced {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub added: BTreeSet<SubjectId>,
    pub removed: BTreeSet<SubjectId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionSynced,
    event_type = "enrollment.subscription_synced.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);
