//! # Session Orchestration
//!
//! [`SyncSession`] is the explicitly owned, injectable session store: one
//! instance per user session, created at login, cleared at logout. It wires
//! the three record workspaces to the staging pipeline, the conflict
//! detector, and the confirmation gate, and it owns the editing context (the
//! currently selected patient).
//!
//! [`ClinicSystem`] is the runtime harness for demos and integration tests:
//! it spawns one in-memory [`RecordStore`] task per record type, wires a
//! session on top, and shuts the whole thing down by dropping the clients
//! and awaiting the store tasks, the same lifecycle the production
//! deployment follows with its real transport.

use crate::backend::{RecordBackend, RecordStore, StoreClient};
use crate::engine::commit::{BulkCommitReport, CommitDecision};
use crate::engine::conflict::{ConflictReport, DraftConflictDetector};
use crate::engine::error::SyncError;
use crate::engine::staging::{Draft, DraftCommitReport, DraftId, DraftStagingPipeline};
use crate::records::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentPatch, AppointmentScope, Patient,
    PatientId, PatientScope, Pendency, PendencyPatch, PendencyScope,
};
use crate::session::confirm::{AutoConfirm, ConfirmGate};
use crate::workspace::RecordWorkspace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Client-side view of the clinic backend for one user session.
pub struct SyncSession {
    pub patients: RecordWorkspace<Patient>,
    pub appointments: RecordWorkspace<Appointment>,
    pub pendencies: RecordWorkspace<Pendency>,
    staging: DraftStagingPipeline<Appointment>,
    detector: DraftConflictDetector,
    confirm: Arc<dyn ConfirmGate>,
    selected_patient: Option<PatientId>,
}

impl SyncSession {
    pub fn new(
        patient_backend: Arc<dyn RecordBackend<Patient>>,
        appointment_backend: Arc<dyn RecordBackend<Appointment>>,
        pendency_backend: Arc<dyn RecordBackend<Pendency>>,
        confirm: Arc<dyn ConfirmGate>,
    ) -> Self {
        Self {
            patients: RecordWorkspace::new(patient_backend),
            appointments: RecordWorkspace::new(appointment_backend),
            pendencies: RecordWorkspace::new(pendency_backend),
            staging: DraftStagingPipeline::new(),
            detector: DraftConflictDetector::default(),
            confirm,
            selected_patient: None,
        }
    }

    /// Overrides the conflict window, e.g. for clinics issuing weekly
    /// recurring rows.
    pub fn with_detector(mut self, detector: DraftConflictDetector) -> Self {
        self.detector = detector;
        self
    }

    // --- Editing context ---

    pub fn selected_patient(&self) -> Option<&PatientId> {
        self.selected_patient.as_ref()
    }

    /// Switches the editing context. Journal and staging state of the prior
    /// patient are discarded immediately, without awaiting in-flight
    /// requests; a late response lands in a cache slot nothing reads.
    pub fn select_patient(&mut self, patient: Option<PatientId>) {
        if self.selected_patient == patient {
            return;
        }
        info!(from = ?self.selected_patient, to = ?patient, "patient context switch");
        self.appointments.discard_edits();
        self.pendencies.discard_edits();
        self.staging.clear();
        self.selected_patient = patient;
    }

    fn require_selected_patient(&self) -> Result<PatientId, SyncError> {
        self.selected_patient
            .clone()
            .ok_or_else(|| SyncError::Validation("no patient selected".into()))
    }

    // --- Cache-mediated reads ---

    pub async fn roster(&self) -> Result<Vec<Patient>, SyncError> {
        self.patients.collection(&PatientScope::All).await
    }

    pub async fn patient(&self, id: &PatientId) -> Result<Patient, SyncError> {
        self.patients.detail(id).await
    }

    /// One patient's appointments, with journaled local edits overlaid.
    pub async fn appointments_for(&self, patient: &PatientId) -> Result<Vec<Appointment>, SyncError> {
        let scope = AppointmentScope::Patient(patient.clone());
        let rows = self.appointments.collection(&scope).await?;
        Ok(self.appointments.with_local_edits(rows))
    }

    /// One patient's pendencies, with journaled local edits overlaid.
    pub async fn pendencies_for(&self, patient: &PatientId) -> Result<Vec<Pendency>, SyncError> {
        let scope = PendencyScope::Patient(patient.clone());
        let rows = self.pendencies.collection(&scope).await?;
        Ok(self.pendencies.with_local_edits(rows))
    }

    // --- Row edits and bulk commits ---

    pub fn edit_appointment(&mut self, base: &Appointment, patch: AppointmentPatch) {
        self.appointments.stage_edit(base, patch);
    }

    pub fn edit_pendency(&mut self, base: &Pendency, patch: PendencyPatch) {
        self.pendencies.stage_edit(base, patch);
    }

    /// Commits every dirty appointment row for the selected patient.
    /// Declined confirmation is a complete no-op.
    #[instrument(skip(self))]
    pub async fn commit_appointment_edits(
        &mut self,
    ) -> Result<CommitDecision<BulkCommitReport<Appointment>>, SyncError> {
        let patient = self.require_selected_patient()?;
        let dirty = self.appointments.dirty_count();
        if dirty == 0 {
            return Err(SyncError::Validation(
                "no locally modified appointments to commit".into(),
            ));
        }
        let prompt = format!("Save {dirty} modified appointment(s)?");
        if !self.confirm.confirm(&prompt).await {
            info!("bulk appointment commit declined");
            return Ok(CommitDecision::Declined);
        }
        let scope = AppointmentScope::Patient(patient);
        let report = self.appointments.commit_edits(&scope).await?;
        Ok(CommitDecision::Completed(report))
    }

    /// Commits every dirty pendency row for the selected patient.
    #[instrument(skip(self))]
    pub async fn commit_pendency_edits(
        &mut self,
    ) -> Result<CommitDecision<BulkCommitReport<Pendency>>, SyncError> {
        let patient = self.require_selected_patient()?;
        let dirty = self.pendencies.dirty_count();
        if dirty == 0 {
            return Err(SyncError::Validation(
                "no locally modified pendencies to commit".into(),
            ));
        }
        let prompt = format!("Save {dirty} modified pendency(ies)?");
        if !self.confirm.confirm(&prompt).await {
            info!("bulk pendency commit declined");
            return Ok(CommitDecision::Declined);
        }
        let scope = PendencyScope::Patient(patient);
        let report = self.pendencies.commit_edits(&scope).await?;
        Ok(CommitDecision::Completed(report))
    }

    // --- Draft generation flow ---

    /// Pre-check before generating drafts at `target_date`: scans the
    /// selected patient's existing appointments for the conflict window.
    /// Empty or unparseable input skips the check and reports no conflicts.
    #[instrument(skip(self))]
    pub async fn check_draft_conflicts(&self, target_date: &str) -> Result<ConflictReport, SyncError> {
        let patient = self.require_selected_patient()?;
        let Some(target) = DraftConflictDetector::parse_target(target_date) else {
            return Ok(ConflictReport::none());
        };
        let scope = AppointmentScope::Patient(patient);
        let rows = self.appointments.collection(&scope).await?;
        Ok(self.detector.scan(target, &rows))
    }

    /// Stages generator output as editable drafts. The generator itself is
    /// an external collaborator; the session only owns the staged list.
    pub fn stage_drafts(&mut self, suggestions: Vec<AppointmentDraft>) -> Result<Vec<DraftId>, SyncError> {
        self.require_selected_patient()?;
        if suggestions.is_empty() {
            return Err(SyncError::Validation(
                "draft generation produced no suggestions".into(),
            ));
        }
        let staged = self.staging.stage(suggestions);
        Ok(staged.iter().map(|d| d.id().clone()).collect())
    }

    pub fn update_draft(&mut self, id: &DraftId, edit: impl FnOnce(&mut AppointmentDraft)) -> bool {
        self.staging.update_draft(id, edit)
    }

    pub fn remove_draft(&mut self, id: &DraftId) -> bool {
        self.staging.remove_draft(id)
    }

    pub fn drafts(&self) -> &[Draft<Appointment>] {
        self.staging.drafts()
    }

    pub fn draft_count(&self) -> usize {
        self.staging.len()
    }

    /// Persists every staged draft (settle-all). Any success invalidates the
    /// patient's cached appointment scopes so the next read picks up the
    /// server-assigned rows; full success additionally resets the draft
    /// context.
    #[instrument(skip(self))]
    pub async fn commit_drafts(
        &mut self,
    ) -> Result<CommitDecision<DraftCommitReport<Appointment>>, SyncError> {
        let patient = self.require_selected_patient()?;
        if self.staging.is_empty() {
            return Err(SyncError::Validation("no drafts staged".into()));
        }
        let prompt = format!("Create {} staged appointment(s)?", self.staging.len());
        if !self.confirm.confirm(&prompt).await {
            info!("draft commit declined");
            return Ok(CommitDecision::Declined);
        }

        let backend = self.appointments.backend();
        let report = self.staging.commit_all(&backend).await;

        if report.successes() > 0 {
            self.appointments
                .invalidate_collection(&AppointmentScope::Patient(patient.clone()));
            self.appointments.invalidate_collection(&AppointmentScope::All);
        }
        if report.is_full_success()
            && self.appointments.dirty_count() == 0
            && self.pendencies.dirty_count() == 0
        {
            // Completion resets the draft context unless row edits are
            // still pending in this context.
            self.selected_patient = None;
        }
        Ok(CommitDecision::Completed(report))
    }

    // --- Destructive single operations ---

    /// Deletes one appointment after confirmation. Evicts the detail entry
    /// and every collection scope that could contain the row.
    #[instrument(skip(self))]
    pub async fn delete_appointment(&mut self, id: &AppointmentId) -> Result<CommitDecision<()>, SyncError> {
        let prompt = format!("Delete appointment {id}?");
        if !self.confirm.confirm(&prompt).await {
            info!(%id, "delete declined");
            return Ok(CommitDecision::Declined);
        }
        self.appointments.delete(id, &AppointmentScope::All).await?;
        if let Some(patient) = &self.selected_patient {
            self.appointments
                .invalidate_collection(&AppointmentScope::Patient(patient.clone()));
        }
        Ok(CommitDecision::Completed(()))
    }

    /// Session end / logout: drops caches, journals, staging, selection.
    pub fn clear(&mut self) {
        self.patients.clear();
        self.appointments.clear();
        self.pendencies.clear();
        self.staging.clear();
        self.selected_patient = None;
    }
}

/// In-memory runtime: three store tasks plus a wired session.
///
/// The raw store clients are public so tests and demos can seed data
/// through the same API the real backend exposes.
pub struct ClinicSystem {
    pub session: SyncSession,
    pub patient_api: StoreClient<Patient>,
    pub appointment_api: StoreClient<Appointment>,
    pub pendency_api: StoreClient<Pendency>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Default for ClinicSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicSystem {
    pub fn new() -> Self {
        Self::with_confirm(Arc::new(AutoConfirm))
    }

    pub fn with_confirm(confirm: Arc<dyn ConfirmGate>) -> Self {
        let (patient_store, patient_api) = RecordStore::<Patient>::new(32, sequence("pat"));
        let (appointment_store, appointment_api) =
            RecordStore::<Appointment>::new(32, sequence("apt"));
        let (pendency_store, pendency_api) = RecordStore::<Pendency>::new(32, sequence("pend"));

        let handles = vec![
            tokio::spawn(patient_store.run()),
            tokio::spawn(appointment_store.run()),
            tokio::spawn(pendency_store.run()),
        ];

        let session = SyncSession::new(
            Arc::new(patient_api.clone()),
            Arc::new(appointment_api.clone()),
            Arc::new(pendency_api.clone()),
            confirm,
        );

        Self {
            session,
            patient_api,
            appointment_api,
            pendency_api,
            handles,
        }
    }

    /// Graceful shutdown: dropping every client closes the channels, each
    /// store task drains and exits, and panics surface here.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("shutting down clinic system");
        let Self {
            session,
            patient_api,
            appointment_api,
            pendency_api,
            handles,
        } = self;
        drop(session);
        drop(patient_api);
        drop(appointment_api);
        drop(pendency_api);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("store task failed: {e:?}");
                return Err(format!("store task failed: {e:?}"));
            }
        }
        info!("clinic system shutdown complete");
        Ok(())
    }
}

/// Prefixed sequential id generator for the in-memory stores, e.g.
/// `apt_1`, `apt_2`.
fn sequence<Id: From<String>>(prefix: &'static str) -> impl Fn() -> Id + Send + Sync + 'static {
    let counter = Arc::new(AtomicU64::new(1));
    move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        Id::from(format!("{prefix}_{n}"))
    }
}
