//! Record lifecycle synchronization.
//!
//! Store mutations are described by [`LifecycleEvent`]s; the [`Synchronizer`]
//! turns each event into a [`SyncDecision`] under the current [`SyncPolicy`].

use crate::model::Model;
use crate::types::{Row, SoftDeletePolicy};
use std::collections::{BTreeSet, HashSet};
use tracing::trace;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Created or updated.
    Saved,
    /// Trashed when the model soft deletes, removed otherwise.
    Deleted,
    ForceDeleted,
    Restored,
}

/// A store mutation as seen by the synchronizer.
#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleEvent {
    pub transition: Transition,
    /// The row after the change. For removals, the row as it was removed.
    pub row: Row,
    /// The row before the change, if it existed.
    pub previous: Option<Row>,
    /// Attributes touched by a save. Empty for other transitions.
    pub changed: BTreeSet<String>,
}

impl LifecycleEvent {
    pub fn saved(row: Row, previous: Option<Row>) -> Self {
        let changed = match &previous {
            Some(previous) => Row::changed_between(&previous.attributes, &row.attributes),
            None => row.attributes.keys().cloned().collect(),
        };
        Self {
            transition: Transition::Saved,
            row,
            previous,
            changed,
        }
    }

    pub fn deleted(row: Row, previous: Option<Row>) -> Self {
        Self::without_changes(Transition::Deleted, row, previous)
    }

    pub fn force_deleted(row: Row) -> Self {
        let previous = Some(row.clone());
        Self::without_changes(Transition::ForceDeleted, row, previous)
    }

    pub fn restored(row: Row, previous: Option<Row>) -> Self {
        Self::without_changes(Transition::Restored, row, previous)
    }

    fn without_changes(transition: Transition, row: Row, previous: Option<Row>) -> Self {
        Self {
            transition,
            row,
            previous,
            changed: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncDecision {
    Index,
    Remove,
    Skip,
}

/// Which models currently sync, and how soft deletes reach the index.
#[derive(Clone, Debug, Default)]
pub struct SyncPolicy {
    disabled: HashSet<String>,
    soft_delete: SoftDeletePolicy,
}

impl SyncPolicy {
    pub fn new(soft_delete: SoftDeletePolicy) -> Self {
        Self {
            disabled: HashSet::new(),
            soft_delete,
        }
    }

    /// Returns whether syncing was enabled before the call.
    pub fn disable(&mut self, model: &str) -> bool {
        self.disabled.insert(model.to_string())
    }

    /// Returns whether syncing was disabled before the call.
    pub fn enable(&mut self, model: &str) -> bool {
        self.disabled.remove(model)
    }

    pub fn is_enabled(&self, model: &str) -> bool {
        !self.disabled.contains(model)
    }

    pub fn soft_delete(&self) -> SoftDeletePolicy {
        self.soft_delete
    }

    /// Whether trashed rows of `model` stay in its index with a flag.
    pub fn keeps_flagged(&self, model: &Model) -> bool {
        model.uses_soft_deletes() && self.soft_delete == SoftDeletePolicy::KeepFlagged
    }
}

#[derive(Clone, Debug, Default)]
pub struct Synchronizer {
    policy: SyncPolicy,
}

impl Synchronizer {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut SyncPolicy {
        &mut self.policy
    }

    pub fn decide(&self, model: &Model, event: &LifecycleEvent) -> SyncDecision {
        let decision = if !self.policy.is_enabled(model.name()) {
            SyncDecision::Skip
        } else {
            match event.transition {
                Transition::Saved => self.decide_saved(model, event, false),
                Transition::Deleted => {
                    if !self.was_searchable(model, event) {
                        SyncDecision::Skip
                    } else if self.policy.keeps_flagged(model) {
                        self.decide_saved(model, event, true)
                    } else {
                        SyncDecision::Remove
                    }
                }
                Transition::ForceDeleted => SyncDecision::Remove,
                Transition::Restored => self.decide_saved(model, event, true),
            }
        };

        trace!(
            model = model.name(),
            key = %event.row.key,
            transition = ?event.transition,
            ?decision,
            "sync decision"
        );
        decision
    }

    fn decide_saved(&self, model: &Model, event: &LifecycleEvent, forced: bool) -> SyncDecision {
        if !forced
            && !event.changed.is_empty()
            && event.changed.iter().all(|name| model.is_insensitive(name))
        {
            return SyncDecision::Skip;
        }

        if self.is_searchable(model, &event.row) {
            SyncDecision::Index
        } else if self.was_searchable(model, event) {
            SyncDecision::Remove
        } else {
            SyncDecision::Skip
        }
    }

    fn was_searchable(&self, model: &Model, event: &LifecycleEvent) -> bool {
        event
            .previous
            .as_ref()
            .is_some_and(|previous| self.is_searchable(model, previous))
    }

    /// A trashed row only counts as searchable while the index keeps flagged rows.
    fn is_searchable(&self, model: &Model, row: &Row) -> bool {
        if row.is_trashed() && !self.policy.keeps_flagged(model) {
            return false;
        }
        model.should_be_searchable(row)
    }
}
