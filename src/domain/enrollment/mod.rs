//! Enrollment domain - subscription grants and subject entitlements.
//!
//! A subscription grant is the entitlement side of a paid order: one per
//! (user, order), carrying the set of subjects the purchased course
//! unlocks. Financial state never lives here; a grant references its
//! order but the invoice remains the money record.

mod events;
mod subject_diff;
mod subscription;

pub use events::{ActivationFailed, SubscriptionActivated, SubscriptionSynced};
pub use subject_diff::SubjectDiff;
pub use subscription::{GrantStatus, Subscription};
