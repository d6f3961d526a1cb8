//! Full end-to-end flows against the in-memory clinic system: draft
//! generation with conflict pre-checks, bulk row editing, confirmation
//! gating, deletion, and context switching.

use chrono::NaiveDate;
use clinic_sync::backend::RecordBackend;
use clinic_sync::records::{
    AppointmentDraft, AppointmentPatch, AppointmentStatus, PatientDraft, PendencyDraft,
    PendencyPatch, PendencyStatus,
};
use clinic_sync::session::{ClinicSystem, ScriptedConfirm};
use clinic_sync::engine::SyncError;
use std::sync::Arc;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seed_patient(system: &ClinicSystem, name: &str) -> clinic_sync::records::Patient {
    system
        .patient_api
        .create(PatientDraft {
            name: name.to_string(),
            document: "123.456.789-00".to_string(),
            birth_date: None,
        })
        .await
        .expect("failed to seed patient")
}

#[tokio::test]
async fn draft_flow_warns_then_stages_then_commits() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Alice Martins").await;

    // Existing appointment four days before the requested target date.
    system
        .appointment_api
        .create(AppointmentDraft::new(
            patient.id.clone(),
            "Cardiology",
            Some(date("2024-01-01")),
        ))
        .await
        .unwrap();

    system.session.select_patient(Some(patient.id.clone()));

    // Pre-check: one conflict inside the ten-day window.
    let warnings = system
        .session
        .check_draft_conflicts("2024-01-05")
        .await
        .unwrap();
    assert!(warnings.has_conflict());
    assert_eq!(warnings.total, 1);
    assert_eq!(warnings.conflicts[0].date, date("2024-01-01"));

    // The user reviews the warning and proceeds anyway.
    let staged = system
        .session
        .stage_drafts(vec![AppointmentDraft::new(
            patient.id.clone(),
            "Cardiology",
            Some(date("2024-01-05")),
        )])
        .unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(system.session.draft_count(), 1);

    let report = system
        .session
        .commit_drafts()
        .await
        .unwrap()
        .completed()
        .expect("confirmation was auto-approved");
    assert!(report.is_full_success());
    assert_eq!(system.session.draft_count(), 0);
    // Completion resets the draft context.
    assert!(system.session.selected_patient().is_none());

    // The invalidated scope refetches and now shows both rows.
    let rows = system.session.appointments_for(&patient.id).await.unwrap();
    assert_eq!(rows.len(), 2);

    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn empty_target_date_never_reports_conflicts() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Bruno Costa").await;
    system
        .appointment_api
        .create(AppointmentDraft::new(
            patient.id.clone(),
            "Neurology",
            Some(date("2024-01-01")),
        ))
        .await
        .unwrap();

    system.session.select_patient(Some(patient.id.clone()));
    let warnings = system.session.check_draft_conflicts("").await.unwrap();
    assert!(!warnings.has_conflict());
    assert!(warnings.conflicts.is_empty());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn bulk_edit_commits_every_dirty_row() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Carla Dias").await;
    for specialty in ["Cardiology", "Dermatology", "Orthopedics"] {
        system
            .appointment_api
            .create(AppointmentDraft::new(
                patient.id.clone(),
                specialty,
                Some(date("2024-02-10")),
            ))
            .await
            .unwrap();
    }

    system.session.select_patient(Some(patient.id.clone()));
    let rows = system.session.appointments_for(&patient.id).await.unwrap();
    assert_eq!(rows.len(), 3);

    for row in &rows {
        system.session.edit_appointment(
            row,
            AppointmentPatch {
                status: Some(AppointmentStatus::Confirmed),
                ..Default::default()
            },
        );
    }
    assert_eq!(system.session.appointments.dirty_count(), 3);

    let report = system
        .session
        .commit_appointment_edits()
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(report.is_full_success());
    assert_eq!(report.successes(), 3);
    assert_eq!(system.session.appointments.dirty_count(), 0);

    // The committed rows were written through the cache.
    let after = system.session.appointments_for(&patient.id).await.unwrap();
    assert!(after.iter().all(|r| r.status == AppointmentStatus::Confirmed));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn pendency_rows_share_the_same_edit_flow() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Diego Nunes").await;
    system
        .pendency_api
        .create(PendencyDraft {
            patient_id: patient.id.clone(),
            description: "Missing consent form".to_string(),
            due_date: Some(date("2024-02-01")),
        })
        .await
        .unwrap();

    system.session.select_patient(Some(patient.id.clone()));
    let rows = system.session.pendencies_for(&patient.id).await.unwrap();
    system.session.edit_pendency(
        &rows[0],
        PendencyPatch {
            status: Some(PendencyStatus::Resolved),
            ..Default::default()
        },
    );

    let report = system
        .session
        .commit_pendency_edits()
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(report.is_full_success());

    let after = system.session.pendencies_for(&patient.id).await.unwrap();
    assert_eq!(after[0].status, PendencyStatus::Resolved);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn declined_confirmation_leaves_everything_untouched() {
    let mut system =
        ClinicSystem::with_confirm(Arc::new(ScriptedConfirm::new([false])));
    let patient = seed_patient(&system, "Elena Prado").await;
    let created = system
        .appointment_api
        .create(AppointmentDraft::new(
            patient.id.clone(),
            "Cardiology",
            Some(date("2024-02-10")),
        ))
        .await
        .unwrap();

    system.session.select_patient(Some(patient.id.clone()));
    let rows = system.session.appointments_for(&patient.id).await.unwrap();
    system.session.edit_appointment(
        &rows[0],
        AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        },
    );

    let decision = system.session.commit_appointment_edits().await.unwrap();
    assert!(decision.completed().is_none());

    // Still dirty locally, and the store never saw the write.
    assert_eq!(system.session.appointments.dirty_count(), 1);
    let server_row = system
        .appointment_api
        .fetch_by_id(created.id.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(server_row.status, AppointmentStatus::Scheduled);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn operations_without_a_selected_patient_fail_validation() {
    let mut system = ClinicSystem::new();

    let commit = system.session.commit_appointment_edits().await;
    assert!(matches!(commit, Err(SyncError::Validation(_))));

    let stage = system.session.stage_drafts(vec![]);
    assert!(matches!(stage, Err(SyncError::Validation(_))));

    let check = system.session.check_draft_conflicts("2024-01-05").await;
    assert!(matches!(check, Err(SyncError::Validation(_))));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn deleting_a_row_evicts_its_cached_scopes() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Fabio Rocha").await;
    let created = system
        .appointment_api
        .create(AppointmentDraft::new(
            patient.id.clone(),
            "Dermatology",
            Some(date("2024-03-03")),
        ))
        .await
        .unwrap();

    system.session.select_patient(Some(patient.id.clone()));
    assert_eq!(
        system.session.appointments_for(&patient.id).await.unwrap().len(),
        1
    );

    system
        .session
        .delete_appointment(&created.id)
        .await
        .unwrap()
        .completed()
        .expect("auto-confirmed");

    // The invalidated scope refetches and the row is gone.
    assert!(system
        .session
        .appointments_for(&patient.id)
        .await
        .unwrap()
        .is_empty());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn switching_patients_discards_journal_and_staging() {
    let mut system = ClinicSystem::new();
    let first = seed_patient(&system, "Gina Souza").await;
    let second = seed_patient(&system, "Hugo Lima").await;
    system
        .appointment_api
        .create(AppointmentDraft::new(
            first.id.clone(),
            "Cardiology",
            Some(date("2024-02-10")),
        ))
        .await
        .unwrap();

    system.session.select_patient(Some(first.id.clone()));
    let rows = system.session.appointments_for(&first.id).await.unwrap();
    system.session.edit_appointment(
        &rows[0],
        AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            ..Default::default()
        },
    );
    system
        .session
        .stage_drafts(vec![AppointmentDraft::new(
            first.id.clone(),
            "Cardiology",
            None,
        )])
        .unwrap();
    assert_eq!(system.session.appointments.dirty_count(), 1);
    assert_eq!(system.session.draft_count(), 1);

    system.session.select_patient(Some(second.id.clone()));
    assert_eq!(system.session.appointments.dirty_count(), 0);
    assert_eq!(system.session.draft_count(), 0);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn session_clear_forgets_cached_reads() {
    let mut system = ClinicSystem::new();
    let patient = seed_patient(&system, "Iris Melo").await;

    system.session.select_patient(Some(patient.id.clone()));
    assert!(system
        .session
        .appointments_for(&patient.id)
        .await
        .unwrap()
        .is_empty());

    // A row created behind the cache's back is invisible until the session
    // is cleared (logout) or the scope is refreshed.
    system
        .appointment_api
        .create(AppointmentDraft::new(
            patient.id.clone(),
            "Cardiology",
            None,
        ))
        .await
        .unwrap();
    assert!(system
        .session
        .appointments_for(&patient.id)
        .await
        .unwrap()
        .is_empty());

    system.session.clear();
    assert_eq!(
        system.session.appointments_for(&patient.id).await.unwrap().len(),
        1
    );

    system.shutdown().await.unwrap();
}
