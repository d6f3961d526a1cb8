//! # Record Workspace
//!
//! One workspace per record type wires the backend to its collection and
//! detail caches, its edit journal, and its bulk-commit coordinator. The
//! presentation layer talks to workspaces (through
//! [`crate::session::SyncSession`]); it never touches the backend or the
//! caches directly, so every cache write goes through
//! `write_through`/`invalidate`/`force_refresh` and readers never observe a
//! torn state.

use crate::backend::{BackendError, RecordBackend};
use crate::engine::cache::ReadThroughCache;
use crate::engine::commit::{BulkCommitCoordinator, BulkCommitReport};
use crate::engine::error::SyncError;
use crate::engine::journal::EditJournal;
use crate::record::SyncRecord;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct RecordWorkspace<T: SyncRecord> {
    backend: Arc<dyn RecordBackend<T>>,
    collections: ReadThroughCache<T::Scope, Vec<T>>,
    details: ReadThroughCache<T::Id, T>,
    journal: EditJournal<T>,
    coordinator: BulkCommitCoordinator<T>,
}

impl<T: SyncRecord> RecordWorkspace<T> {
    pub fn new(backend: Arc<dyn RecordBackend<T>>) -> Self {
        Self {
            coordinator: BulkCommitCoordinator::new(backend.clone()),
            collections: ReadThroughCache::new(),
            details: ReadThroughCache::new(),
            journal: EditJournal::new(),
            backend,
        }
    }

    /// Handle to the backend, for collaborators that persist outside the
    /// journal path (the draft staging pipeline).
    pub fn backend(&self) -> Arc<dyn RecordBackend<T>> {
        self.backend.clone()
    }

    // --- Reads (cache-mediated) ---

    /// Collection read-through: fetched at most once per scope and session,
    /// unless invalidated or force-refreshed.
    #[instrument(skip(self))]
    pub async fn collection(&self, scope: &T::Scope) -> Result<Vec<T>, SyncError> {
        let backend = self.backend.clone();
        let wanted = scope.clone();
        self.collections
            .get(scope, || async move { backend.fetch_collection(wanted).await })
            .await
    }

    /// Unconditional reload of one collection scope.
    #[instrument(skip(self))]
    pub async fn refresh_collection(&self, scope: &T::Scope) -> Result<Vec<T>, SyncError> {
        let backend = self.backend.clone();
        let wanted = scope.clone();
        self.collections
            .force_refresh(scope, || async move { backend.fetch_collection(wanted).await })
            .await
    }

    /// Detail read-through. An id unknown to the backend surfaces as
    /// [`BackendError::NotFound`]; the miss is not cached.
    #[instrument(skip(self))]
    pub async fn detail(&self, id: &T::Id) -> Result<T, SyncError> {
        let backend = self.backend.clone();
        let wanted = id.clone();
        self.details
            .get(id, || async move {
                match backend.fetch_by_id(wanted.clone()).await? {
                    Some(record) => Ok(record),
                    None => Err(BackendError::NotFound(wanted.to_string())),
                }
            })
            .await
    }

    // --- Local edits ---

    /// Journals a field-level edit on an already-persisted row.
    pub fn stage_edit(&mut self, base: &T, patch: T::Patch) {
        self.journal.mark_dirty(base, patch);
    }

    pub fn is_dirty(&self, id: &T::Id) -> bool {
        self.journal.is_dirty(id)
    }

    pub fn dirty_count(&self) -> usize {
        self.journal.len()
    }

    pub fn dirty_ids(&self) -> Vec<T::Id> {
        self.journal.dirty_ids()
    }

    pub fn dirty_snapshot(&self, id: &T::Id) -> Option<&T> {
        self.journal.dirty_snapshot(id)
    }

    /// Read-only view of the journal, for derived displays (dirty badges,
    /// failure reasons).
    pub fn journal(&self) -> &EditJournal<T> {
        &self.journal
    }

    /// Overlays journaled snapshots onto freshly read rows, so the grid
    /// shows local edits on top of server truth.
    pub fn with_local_edits(&self, mut rows: Vec<T>) -> Vec<T> {
        for row in &mut rows {
            if let Some(snapshot) = self.journal.dirty_snapshot(row.id()) {
                *row = snapshot.clone();
            }
        }
        rows
    }

    pub fn discard_edit(&mut self, id: &T::Id) -> bool {
        self.journal.discard(id)
    }

    pub fn discard_edits(&mut self) -> bool {
        self.journal.discard_all()
    }

    // --- Commit ---

    /// Commits every dirty row concurrently (settle-all) and reconciles the
    /// caches. Full success writes the server-returned rows through; partial
    /// failure keeps the failed rows dirty and force-refreshes the
    /// collection, because partially applied writes may have moved server
    /// state underneath the survivors.
    #[instrument(skip(self))]
    pub async fn commit_edits(&mut self, scope: &T::Scope) -> Result<BulkCommitReport<T>, SyncError> {
        debug!(dirty = self.journal.len(), "bulk commit requested");
        let report = self.coordinator.commit_journal(&mut self.journal).await;

        for row in &report.committed {
            self.details.write_through(row.id(), row.clone()).await;
        }

        if report.is_full_success() {
            self.write_back_collection(scope, &report.committed).await;
        } else if let Err(error) = self.refresh_collection(scope).await {
            // The degraded report already carries the failure count; a
            // failed reconcile must not mask it.
            warn!(%error, "collection refresh after degraded commit failed");
        }

        Ok(report)
    }

    async fn write_back_collection(&self, scope: &T::Scope, updated: &[T]) {
        if updated.is_empty() {
            return;
        }
        let Some(entry) = self.collections.peek(scope).await else {
            return;
        };
        let mut rows = entry.value;
        for fresh in updated {
            if let Some(stale) = rows.iter_mut().find(|r| r.id() == fresh.id()) {
                *stale = fresh.clone();
            }
        }
        self.collections.write_through(scope, rows).await;
    }

    /// Evicts one cached collection scope so the next read refetches. Used
    /// after creations land (draft commits) and after cross-scope deletes.
    pub fn invalidate_collection(&self, scope: &T::Scope) {
        self.collections.invalidate(scope);
    }

    // --- Delete ---

    /// Deletes one row remotely and invalidates every cache entry in its
    /// scope. Local edits for the row are discarded.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &T::Id, scope: &T::Scope) -> Result<(), SyncError> {
        self.backend.delete(id.clone()).await?;
        self.journal.discard(id);
        self.details.invalidate(id);
        self.collections.invalidate(scope);
        Ok(())
    }

    /// Drops caches and journal. Session end or context switch.
    pub fn clear(&mut self) {
        self.collections.clear();
        self.details.clear();
        self.journal.discard_all();
    }
}
