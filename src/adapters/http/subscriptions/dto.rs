//! HTTP DTOs for subscription endpoints.

use serde::Serialize;

use crate::application::handlers::enrollment::{RefreshOutcome, SyncStatus};
use crate::domain::enrollment::SubjectDiff;

/// Subject-set changes applied or pending.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDiffResponse {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl From<&SubjectDiff> for SubjectDiffResponse {
    fn from(diff: &SubjectDiff) -> Self {
        Self {
            added: diff.added.iter().map(|s| s.to_string()).collect(),
            removed: diff.removed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of refreshing one grant against the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub subscription_id: String,
    pub has_changes: bool,
    pub diff: SubjectDiffResponse,
}

impl From<RefreshOutcome> for RefreshResponse {
    fn from(outcome: RefreshOutcome) -> Self {
        Self {
            subscription_id: outcome.subscription_id.to_string(),
            has_changes: outcome.has_changes(),
            diff: SubjectDiffResponse::from(&outcome.diff),
        }
    }
}

/// Read-only answer to "would a sync change anything?".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub subscription_id: String,
    pub in_sync: bool,
    pub pending: SubjectDiffResponse,
}

impl From<SyncStatus> for SyncStatusResponse {
    fn from(status: SyncStatus) -> Self {
        Self {
            subscription_id: status.subscription_id.to_string(),
            in_sync: status.in_sync,
            pending: SubjectDiffResponse::from(&status.pending),
        }
    }
}
