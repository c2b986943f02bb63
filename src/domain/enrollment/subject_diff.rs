//! Set difference between a grant's subjects and the catalog's.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::SubjectId;

/// What a sync would change on a grant.
///
/// Ordered sets keep the diff deterministic, so two syncs against the
/// same catalog state report identical results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDiff {
    /// In the catalog but not yet on the grant.
    pub added: BTreeSet<SubjectId>,
    /// On the grant but no longer in the catalog.
    pub removed: BTreeSet<SubjectId>,
}

impl SubjectDiff {
    /// Computes the diff from `current` grant subjects to `target` catalog
    /// subjects.
    pub fn between(current: &BTreeSet<SubjectId>, target: &BTreeSet<SubjectId>) -> Self {
        Self {
            added: target.difference(current).copied().collect(),
            removed: current.difference(target).copied().collect(),
        }
    }

    /// True when the grant already matches the catalog.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn subject(n: u128) -> SubjectId {
        SubjectId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn identical_sets_yield_empty_diff() {
        let set: BTreeSet<_> = [subject(1), subject(2)].into();
        let diff = SubjectDiff::between(&set, &set.clone());
        assert!(diff.is_empty());
    }

    #[test]
    fn between_partitions_added_and_removed() {
        let current: BTreeSet<_> = [subject(1), subject(2)].into();
        let target: BTreeSet<_> = [subject(2), subject(3), subject(4)].into();

        let diff = SubjectDiff::between(&current, &target);

        assert_eq!(diff.added, [subject(3), subject(4)].into());
        assert_eq!(diff.removed, [subject(1)].into());
    }

    #[test]
    fn empty_current_adds_everything() {
        let target: BTreeSet<_> = [subject(1)].into();
        let diff = SubjectDiff::between(&BTreeSet::new(), &target);

        assert_eq!(diff.added, target);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn empty_target_removes_everything() {
        let current: BTreeSet<_> = [subject(1)].into();
        let diff = SubjectDiff::between(&current, &BTreeSet::new());

        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, current);
    }
}
