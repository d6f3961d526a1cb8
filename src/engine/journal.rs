//! # Edit Journal
//!
//! Client-side dirty tracking for already-persisted rows. The journal holds,
//! per entity id, the locally mutated snapshot and the cumulative field
//! patch that still has to reach the backend. An id is dirty exactly while
//! its snapshot differs from the last known committed state; Clean is not a
//! stored state, it is absence from the map.
//!
//! The journal is pure bookkeeping and never performs I/O. Commits are
//! driven by [`crate::engine::commit::BulkCommitCoordinator`], which takes
//! the pending patches out with [`EditJournal::take_pending`] and reports
//! back per id.
//!
//! # Edits racing an in-flight commit
//! `take_pending` moves the cumulative patch into the commit and flips the
//! entry to `Committing`. Edits arriving while the commit is in flight
//! accumulate as a residual patch on the same entry; a later
//! [`EditJournal::commit_one`] only removes the entry when no residual is
//! left, so the newest local edit is layered on top, never lost.

use crate::record::{FieldPatch, SyncRecord};
use std::collections::HashMap;
use std::mem;
use tracing::debug;

/// Where an entry stands in the commit cycle. Clean entries do not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPhase {
    /// Locally modified, not yet sent.
    Dirty,
    /// A commit carrying this entry's patch is in flight.
    Committing,
    /// The last commit attempt failed; the row stays editable and the
    /// attempted patch was merged back for retry.
    Failed { reason: String },
}

/// One journaled row: the mutated snapshot plus the patch still owed to the
/// backend.
#[derive(Debug, Clone)]
pub struct EditEntry<T: SyncRecord> {
    snapshot: T,
    patch: T::Patch,
    phase: EditPhase,
}

impl<T: SyncRecord> EditEntry<T> {
    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }

    pub fn phase(&self) -> &EditPhase {
        &self.phase
    }
}

/// Per-entity dirty set with field-level patch layering.
pub struct EditJournal<T: SyncRecord> {
    entries: HashMap<T::Id, EditEntry<T>>,
}

impl<T: SyncRecord> Default for EditJournal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SyncRecord> EditJournal<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Merges `patch` into the held snapshot of `base`'s row and marks the
    /// id dirty. Only supplied fields change; unsupplied fields keep their
    /// prior values. Repeated calls layer last-write-wins on the current
    /// local snapshot.
    pub fn mark_dirty(&mut self, base: &T, patch: T::Patch) {
        if patch.is_empty() {
            return;
        }
        let entry = self
            .entries
            .entry(base.id().clone())
            .or_insert_with(|| EditEntry {
                snapshot: base.clone(),
                patch: T::Patch::default(),
                phase: EditPhase::Dirty,
            });
        entry.snapshot.apply_patch(&patch);
        entry.patch.merge_from(patch);
        if matches!(entry.phase, EditPhase::Failed { .. }) {
            entry.phase = EditPhase::Dirty;
        }
        debug!(id = %base.id(), "marked dirty");
    }

    pub fn is_dirty(&self, id: &T::Id) -> bool {
        self.entries.contains_key(id)
    }

    /// The locally mutated snapshot for a dirty id.
    pub fn dirty_snapshot(&self, id: &T::Id) -> Option<&T> {
        self.entries.get(id).map(|e| &e.snapshot)
    }

    pub fn entry(&self, id: &T::Id) -> Option<&EditEntry<T>> {
        self.entries.get(id)
    }

    pub fn dirty_ids(&self) -> Vec<T::Id> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves every pending patch out for a commit round. Entries in `Dirty`
    /// or `Failed` phase flip to `Committing` with an emptied patch;
    /// entries already committing are skipped.
    pub fn take_pending(&mut self) -> Vec<(T::Id, T::Patch)> {
        let mut pending = Vec::new();
        for (id, entry) in &mut self.entries {
            if entry.phase == EditPhase::Committing {
                continue;
            }
            entry.phase = EditPhase::Committing;
            pending.push((id.clone(), mem::take(&mut entry.patch)));
        }
        pending
    }

    /// Confirms a successful remote write for `id`. Removes the entry unless
    /// edits accumulated while the commit was in flight, in which case the
    /// entry goes back to `Dirty` carrying only the residual patch. Returns
    /// true when the entry was removed.
    pub fn commit_one(&mut self, id: &T::Id) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.patch.is_empty() => {
                self.entries.remove(id);
                true
            }
            Some(entry) => {
                entry.phase = EditPhase::Dirty;
                false
            }
            None => false,
        }
    }

    /// Records a failed commit attempt for `id`. The attempted patch is
    /// merged back underneath any residual edits so a retry re-sends
    /// everything still owed.
    pub fn mark_failed(&mut self, id: &T::Id, attempted: T::Patch, reason: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(id) {
            let residual = mem::take(&mut entry.patch);
            let mut patch = attempted;
            patch.merge_from(residual);
            entry.patch = patch;
            entry.phase = EditPhase::Failed {
                reason: reason.into(),
            };
        }
    }

    /// Drops the entry for `id`, abandoning its local edits.
    pub fn discard(&mut self, id: &T::Id) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Clears the whole journal. Returns true when anything was discarded.
    pub fn discard_all(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }
}
