//! # Draft Staging Pipeline
//!
//! Owns the transient, editable list of drafts produced by a generation
//! step. Drafts live only here: they carry client-generated temporary ids
//! of a dedicated type ([`DraftId`]), so a draft can never be written into a
//! cache slot keyed by a server-assigned id. On commit, each surviving draft
//! is materialized by the backend and replaced by the returned record; the
//! temporary id is discarded.
//!
//! Draft lifecycle: `Proposed → Edited* → (Committed | Removed |
//! Failed → retryable)`. A failed draft stays staged and editable, so the
//! user retries without redoing the generation step.

use crate::backend::RecordBackend;
use crate::engine::commit::CommitOutcome;
use crate::engine::error::SyncError;
use crate::record::SyncRecord;
use futures::future;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Client-generated temporary identifier for a staged draft.
///
/// Deliberately a distinct type from every record id: the compiler rules out
/// a draft ending up in a by-id cache slot of a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftId(Uuid);

impl DraftId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft-{}", self.0)
    }
}

/// Where a staged draft stands. `Committed` and `Removed` are terminal and
/// therefore never stored: the draft simply leaves the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftPhase {
    Proposed,
    Edited,
    Failed { reason: String },
}

/// A locally staged, not-yet-persisted record proposal.
#[derive(Debug, Clone)]
pub struct Draft<T: SyncRecord> {
    id: DraftId,
    payload: T::Draft,
    phase: DraftPhase,
}

impl<T: SyncRecord> Draft<T> {
    pub fn id(&self) -> &DraftId {
        &self.id
    }

    pub fn payload(&self) -> &T::Draft {
        &self.payload
    }

    pub fn phase(&self) -> &DraftPhase {
        &self.phase
    }
}

/// Aggregate result of a draft commit round.
#[derive(Debug, Clone)]
pub struct DraftCommitReport<T: SyncRecord> {
    pub outcomes: Vec<CommitOutcome<DraftId>>,
    pub created: Vec<T>,
}

impl<T: SyncRecord> DraftCommitReport<T> {
    fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            created: Vec::new(),
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

/// The editable staging list plus its settle-all persistence step.
pub struct DraftStagingPipeline<T: SyncRecord> {
    drafts: Vec<Draft<T>>,
}

impl<T: SyncRecord> Default for DraftStagingPipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SyncRecord> DraftStagingPipeline<T> {
    pub fn new() -> Self {
        Self { drafts: Vec::new() }
    }

    /// Stages raw generator suggestions, assigning each a fresh temporary
    /// id. The cache is never touched. Returns the newly staged drafts.
    pub fn stage(&mut self, suggestions: Vec<T::Draft>) -> &[Draft<T>] {
        let start = self.drafts.len();
        for payload in suggestions {
            self.drafts.push(Draft {
                id: DraftId::generate(),
                payload,
                phase: DraftPhase::Proposed,
            });
        }
        debug!(staged = self.drafts.len() - start, "drafts staged");
        &self.drafts[start..]
    }

    /// Applies a local edit to one draft. Unknown ids are a no-op.
    pub fn update_draft(&mut self, id: &DraftId, edit: impl FnOnce(&mut T::Draft)) -> bool {
        match self.drafts.iter_mut().find(|d| &d.id == id) {
            Some(draft) => {
                edit(&mut draft.payload);
                draft.phase = DraftPhase::Edited;
                true
            }
            None => false,
        }
    }

    /// Removes one draft locally. Unknown ids are a no-op.
    pub fn remove_draft(&mut self, id: &DraftId) -> bool {
        let before = self.drafts.len();
        self.drafts.retain(|d| &d.id != id);
        self.drafts.len() != before
    }

    pub fn drafts(&self) -> &[Draft<T>] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Drops every staged draft (context switch or session end).
    pub fn clear(&mut self) {
        self.drafts.clear();
    }

    /// Persists every staged draft: one create per draft, concurrently,
    /// settle-all. Successes leave the staging list (promoted to records in
    /// the report); failures stay staged, marked retryable.
    pub async fn commit_all(&mut self, backend: &Arc<dyn RecordBackend<T>>) -> DraftCommitReport<T> {
        if self.drafts.is_empty() {
            return DraftCommitReport::empty();
        }

        let tasks = self.drafts.iter().map(|draft| {
            let backend = backend.clone();
            let id = draft.id.clone();
            let payload = draft.payload.clone();
            async move { (id, backend.create(payload).await) }
        });
        let settled = future::join_all(tasks).await;

        let mut report = DraftCommitReport::empty();
        for (id, result) in settled {
            match result {
                Ok(created) => {
                    self.drafts.retain(|d| d.id != id);
                    report.outcomes.push(CommitOutcome::Success { id });
                    report.created.push(created);
                }
                Err(cause) => {
                    warn!(%id, error = %cause, "draft commit failed, kept staged");
                    if let Some(draft) = self.drafts.iter_mut().find(|d| d.id == id) {
                        draft.phase = DraftPhase::Failed {
                            reason: cause.to_string(),
                        };
                    }
                    report.outcomes.push(CommitOutcome::Failure { id, cause });
                }
            }
        }

        info!(
            total = report.total(),
            failures = report.failures(),
            remaining = self.drafts.len(),
            "draft commit settled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::records::{Appointment, AppointmentDraft, AppointmentId, PatientId};
    use chrono::NaiveDate;

    fn draft(specialty: &str) -> AppointmentDraft {
        AppointmentDraft::new(
            PatientId::from("p1"),
            specialty,
            NaiveDate::from_ymd_opt(2024, 1, 5),
        )
    }

    fn persisted(id: &str, specialty: &str) -> Appointment {
        Appointment::new(
            AppointmentId::from(id),
            PatientId::from("p1"),
            specialty,
            NaiveDate::from_ymd_opt(2024, 1, 5),
        )
    }

    #[test]
    fn staging_assigns_distinct_temporary_ids() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        let staged = pipeline.stage(vec![draft("Cardiology"), draft("Neurology")]);
        assert_eq!(staged.len(), 2);
        assert_ne!(staged[0].id(), staged[1].id());
        assert_eq!(*staged[0].phase(), DraftPhase::Proposed);
    }

    #[test]
    fn removing_an_unknown_draft_is_a_noop() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        pipeline.stage(vec![draft("Cardiology")]);

        let unknown = DraftId::generate();
        assert!(!pipeline.remove_draft(&unknown));
        assert_eq!(pipeline.len(), 1);
        assert!(!pipeline.update_draft(&unknown, |d| d.specialty = "X".into()));
    }

    #[test]
    fn updating_a_draft_edits_only_that_draft() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        let ids: Vec<DraftId> = pipeline
            .stage(vec![draft("Cardiology"), draft("Neurology")])
            .iter()
            .map(|d| d.id().clone())
            .collect();

        assert!(pipeline.update_draft(&ids[0], |d| d.specialty = "Orthopedics".into()));

        let drafts = pipeline.drafts();
        assert_eq!(drafts[0].payload().specialty, "Orthopedics");
        assert_eq!(*drafts[0].phase(), DraftPhase::Edited);
        assert_eq!(drafts[1].payload().specialty, "Neurology");
        assert_eq!(*drafts[1].phase(), DraftPhase::Proposed);
    }

    #[tokio::test]
    async fn full_success_clears_staging() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        pipeline.stage(vec![draft("Cardiology"), draft("Neurology")]);

        let mock = MockBackend::<Appointment>::new();
        mock.expect_create().return_ok(persisted("apt_1", "Cardiology"));
        mock.expect_create().return_ok(persisted("apt_2", "Neurology"));
        let backend: Arc<dyn RecordBackend<Appointment>> = Arc::new(mock.clone());

        let report = pipeline.commit_all(&backend).await;

        assert!(report.is_full_success());
        assert_eq!(report.created.len(), 2);
        assert!(pipeline.is_empty());
        mock.verify();
    }

    #[tokio::test]
    async fn partial_failure_keeps_exactly_the_failed_draft() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        pipeline.stage(vec![draft("Cardiology"), draft("Neurology")]);

        // Create expectations pair with drafts in staging order.
        let mock = MockBackend::<Appointment>::new();
        mock.expect_create().return_ok(persisted("apt_1", "Cardiology"));
        mock.expect_create()
            .return_err(BackendError::Transport("connection reset".into()));
        let backend: Arc<dyn RecordBackend<Appointment>> = Arc::new(mock.clone());

        let report = pipeline.commit_all(&backend).await;

        assert_eq!(report.successes(), 1);
        assert_eq!(report.failures(), 1);
        assert_eq!(pipeline.len(), 1);
        let survivor = &pipeline.drafts()[0];
        assert_eq!(survivor.payload().specialty, "Neurology");
        assert!(matches!(survivor.phase(), DraftPhase::Failed { .. }));
        assert!(matches!(
            report.as_result(),
            Err(SyncError::PartialCommit { failed: 1, total: 2 })
        ));
        mock.verify();
    }

    #[tokio::test]
    async fn failed_draft_can_be_retried_after_editing() {
        let mut pipeline = DraftStagingPipeline::<Appointment>::new();
        pipeline.stage(vec![draft("Neurology")]);

        let mock = MockBackend::<Appointment>::new();
        mock.expect_create()
            .return_err(BackendError::Rejected("missing diagnosis".into()));
        let backend: Arc<dyn RecordBackend<Appointment>> = Arc::new(mock.clone());
        pipeline.commit_all(&backend).await;

        let id = pipeline.drafts()[0].id().clone();
        assert!(pipeline.update_draft(&id, |d| d.diagnosis = Some("G43".into())));

        mock.expect_create().return_ok(persisted("apt_9", "Neurology"));
        let report = pipeline.commit_all(&backend).await;
        assert!(report.is_full_success());
        assert!(pipeline.is_empty());
        mock.verify();
    }
}
