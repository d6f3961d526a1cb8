//! # Bulk Commit Coordinator
//!
//! Fans out one independent update per dirty row, concurrently, and joins
//! with settle-all discipline: a failing sibling never cancels the others.
//! Outcomes are partitioned afterwards; failed ids stay in the journal
//! (phase `Failed`, editable, retryable) and successes leave it.
//!
//! Commits are commutative from the coordinator's point of view. It assumes
//! no server-side ordering between distinct rows, so no ordering is enforced
//! between siblings.

use crate::backend::{BackendError, RecordBackend};
use crate::engine::error::SyncError;
use crate::engine::journal::EditJournal;
use crate::record::SyncRecord;
use futures::future;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-item result of a persistence attempt.
#[derive(Debug, Clone)]
pub enum CommitOutcome<Id> {
    Success { id: Id },
    Failure { id: Id, cause: BackendError },
}

impl<Id> CommitOutcome<Id> {
    pub fn id(&self) -> &Id {
        match self {
            CommitOutcome::Success { id } | CommitOutcome::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommitOutcome::Success { .. })
    }
}

/// Aggregate result of one bulk commit round.
///
/// `committed` carries the server-returned rows for the successes so the
/// caller can write them through the cache without a refetch.
#[derive(Debug, Clone)]
pub struct BulkCommitReport<T: SyncRecord> {
    pub outcomes: Vec<CommitOutcome<T::Id>>,
    pub committed: Vec<T>,
}

impl<T: SyncRecord> BulkCommitReport<T> {
    fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            committed: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.total() - self.successes()
    }

    pub fn is_full_success(&self) -> bool {
        self.failures() == 0
    }

    /// Collapses the report into a result. A degraded round always surfaces
    /// as [`SyncError::PartialCommit`] with the failure count intact.
    pub fn as_result(&self) -> Result<(), SyncError> {
        if self.is_full_success() {
            Ok(())
        } else {
            Err(SyncError::PartialCommit {
                failed: self.failures(),
                total: self.total(),
            })
        }
    }
}

/// Outcome of a confirm-gated operation: the gate either let the work run or
/// the whole operation was a no-op.
#[derive(Debug)]
pub enum CommitDecision<R> {
    /// The user did not confirm; nothing was sent.
    Declined,
    Completed(R),
}

impl<R> CommitDecision<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            CommitDecision::Completed(report) => Some(report),
            CommitDecision::Declined => None,
        }
    }
}

/// Issues every pending journal patch as an independent concurrent update.
pub struct BulkCommitCoordinator<T: SyncRecord> {
    backend: Arc<dyn RecordBackend<T>>,
}

impl<T: SyncRecord> BulkCommitCoordinator<T> {
    pub fn new(backend: Arc<dyn RecordBackend<T>>) -> Self {
        Self { backend }
    }

    /// Commits every pending row of `journal` and reconciles the journal
    /// with the outcomes: successes are confirmed (residual edits survive),
    /// failures are marked retryable with their attempted patch restored.
    pub async fn commit_journal(&self, journal: &mut EditJournal<T>) -> BulkCommitReport<T> {
        let pending = journal.take_pending();
        if pending.is_empty() {
            return BulkCommitReport::empty();
        }

        let tasks = pending.into_iter().map(|(id, patch)| {
            let backend = self.backend.clone();
            async move {
                let result = backend.update(id.clone(), patch.clone()).await;
                (id, patch, result)
            }
        });
        // Settle-all join: every sibling runs to completion, success or not.
        let settled = future::join_all(tasks).await;

        let mut report = BulkCommitReport::empty();
        for (id, patch, result) in settled {
            match result {
                Ok(updated) => {
                    journal.commit_one(&id);
                    report.outcomes.push(CommitOutcome::Success { id });
                    report.committed.push(updated);
                }
                Err(cause) => {
                    warn!(%id, error = %cause, "commit failed, row stays dirty");
                    journal.mark_failed(&id, patch, cause.to_string());
                    report.outcomes.push(CommitOutcome::Failure { id, cause });
                }
            }
        }

        info!(
            total = report.total(),
            failures = report.failures(),
            "bulk commit settled"
        );
        report
    }
}
