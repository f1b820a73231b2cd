//! Association reconciliation.
//!
//! [`reconcile`] computes the minimal delta between the ids currently
//! linked to a parent and the ids a caller wants linked. The
//! [`AssociationSyncCoordinator`] applies that delta one id at a time and
//! reports per-id failures instead of aborting, so callers can surface
//! partial success.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::{debug, instrument, warn};

use crate::metrics;
use crate::models::HasAssociationIds;
use crate::ports::AssociationStore;

/// Ids to unlink and ids to link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDelta<Id = i64> {
    /// In `current` but not `desired`, first-seen order, no duplicates.
    pub to_remove: Vec<Id>,
    /// In `desired` but not `current`, first-seen order, no duplicates.
    pub to_add: Vec<Id>,
}

impl<Id> AssociationDelta<Id> {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

impl<Id> Default for AssociationDelta<Id> {
    fn default() -> Self {
        Self {
            to_remove: Vec::new(),
            to_add: Vec::new(),
        }
    }
}

/// Compute the delta turning `current` into `desired`.
///
/// Pure: duplicates in either input are ignored and the relative order of
/// first occurrences is preserved.
pub fn reconcile<Id: Copy + Eq + Hash>(current: &[Id], desired: &[Id]) -> AssociationDelta<Id> {
    let current_set: HashSet<Id> = current.iter().copied().collect();
    let desired_set: HashSet<Id> = desired.iter().copied().collect();

    AssociationDelta {
        to_remove: difference(current, &desired_set),
        to_add: difference(desired, &current_set),
    }
}

fn difference<Id: Copy + Eq + Hash>(ids: &[Id], exclude: &HashSet<Id>) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .copied()
        .filter(|id| !exclude.contains(id) && seen.insert(*id))
        .collect()
}

/// One id whose change could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationFailure {
    pub id: i64,
    pub reason: String,
}

/// Result of applying a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub applied_removals: Vec<i64>,
    pub applied_additions: Vec<i64>,
    pub failed_removals: Vec<AssociationFailure>,
    pub failed_additions: Vec<AssociationFailure>,
}

impl SyncOutcome {
    /// True when every requested change was applied.
    pub fn is_fully_applied(&self) -> bool {
        self.failed_removals.is_empty() && self.failed_additions.is_empty()
    }

    /// Ids that could not be added.
    pub fn failed_addition_ids(&self) -> Vec<i64> {
        self.failed_additions.iter().map(|f| f.id).collect()
    }

    /// Ids that could not be removed.
    pub fn failed_removal_ids(&self) -> Vec<i64> {
        self.failed_removals.iter().map(|f| f.id).collect()
    }
}

/// Applies association deltas against one [`AssociationStore`].
///
/// Removals run before additions, each id independently and in delta
/// order. A failure on one id never prevents the others from running.
pub struct AssociationSyncCoordinator<'a> {
    store: &'a dyn AssociationStore,
}

impl<'a> AssociationSyncCoordinator<'a> {
    pub fn new(store: &'a dyn AssociationStore) -> Self {
        Self { store }
    }

    /// Reconcile `parent`'s current ids against `desired` and apply the delta.
    pub async fn sync<P>(&self, parent: &P, desired: &[i64]) -> SyncOutcome
    where
        P: HasAssociationIds + ?Sized,
    {
        debug_assert_eq!(parent.kind(), self.store.kind());
        let delta = reconcile(parent.association_ids(), desired);
        self.apply(parent.parent_id(), &delta).await
    }

    /// Apply `delta` to the links of `parent_id`.
    #[instrument(
        skip_all,
        fields(
            kind = self.store.kind().as_str(),
            parent_id = parent_id,
            removals = delta.to_remove.len(),
            additions = delta.to_add.len()
        )
    )]
    pub async fn apply(&self, parent_id: i64, delta: &AssociationDelta) -> SyncOutcome {
        let kind = self.store.kind();
        metrics::record_association_sync(kind);

        let mut outcome = SyncOutcome::default();
        if delta.is_empty() {
            debug!("Associations already in sync");
            return outcome;
        }

        for &id in &delta.to_remove {
            match self.store.remove_from(parent_id, id).await {
                Ok(true) => outcome.applied_removals.push(id),
                Ok(false) => outcome.failed_removals.push(AssociationFailure {
                    id,
                    reason: "link not found".to_string(),
                }),
                Err(e) => outcome.failed_removals.push(AssociationFailure {
                    id,
                    reason: e.to_string(),
                }),
            }
        }

        for &id in &delta.to_add {
            match self.store.add_to(parent_id, id).await {
                Ok(true) => outcome.applied_additions.push(id),
                Ok(false) => outcome.failed_additions.push(AssociationFailure {
                    id,
                    reason: "related record not found".to_string(),
                }),
                Err(e) => outcome.failed_additions.push(AssociationFailure {
                    id,
                    reason: e.to_string(),
                }),
            }
        }

        metrics::record_association_failures(kind, "remove", outcome.failed_removals.len() as u64);
        metrics::record_association_failures(kind, "add", outcome.failed_additions.len() as u64);

        if outcome.is_fully_applied() {
            debug!(
                removed = outcome.applied_removals.len(),
                added = outcome.applied_additions.len(),
                "Associations synced"
            );
        } else {
            warn!(
                failed_removals = ?outcome.failed_removal_ids(),
                failed_additions = ?outcome.failed_addition_ids(),
                "Associations partially synced"
            );
        }

        outcome
    }
}
