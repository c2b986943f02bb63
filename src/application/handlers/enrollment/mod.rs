//! Enrollment handlers - subscription-catalog synchronization.

mod sync_subscription;

pub use sync_subscription::{
    CourseRefreshReport, RefreshOutcome, SyncStatus, SyncSubscriptionHandler,
};
