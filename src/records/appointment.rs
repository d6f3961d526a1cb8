//! Appointment records: the rows the dashboard edits in bulk and the target
//! of draft generation. The reference date anchors conflict detection.

use crate::record::{FieldPatch, SyncRecord};
use crate::records::patient::PatientId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned appointment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(String);

impl From<&str> for AppointmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AppointmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// A scheduled clinical appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub specialty: String,
    pub status: AppointmentStatus,
    pub reference_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn new(
        id: impl Into<AppointmentId>,
        patient_id: impl Into<PatientId>,
        specialty: impl Into<String>,
        reference_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: id.into(),
            patient_id: patient_id.into(),
            specialty: specialty.into(),
            status: AppointmentStatus::Scheduled,
            reference_date,
            diagnosis: None,
            notes: None,
        }
    }
}

/// Collection filter: the whole schedule or one patient's rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppointmentScope {
    All,
    Patient(PatientId),
}

/// Payload for a proposed (draft) appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub patient_id: PatientId,
    pub specialty: String,
    pub reference_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn new(
        patient_id: impl Into<PatientId>,
        specialty: impl Into<String>,
        reference_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            specialty: specialty.into(),
            reference_date,
            diagnosis: None,
            notes: None,
        }
    }
}

/// Field-level appointment update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub specialty: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub reference_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

impl FieldPatch for AppointmentPatch {
    fn merge_from(&mut self, newer: Self) {
        if newer.specialty.is_some() {
            self.specialty = newer.specialty;
        }
        if newer.status.is_some() {
            self.status = newer.status;
        }
        if newer.reference_date.is_some() {
            self.reference_date = newer.reference_date;
        }
        if newer.diagnosis.is_some() {
            self.diagnosis = newer.diagnosis;
        }
        if newer.notes.is_some() {
            self.notes = newer.notes;
        }
    }

    fn is_empty(&self) -> bool {
        self.specialty.is_none()
            && self.status.is_none()
            && self.reference_date.is_none()
            && self.diagnosis.is_none()
            && self.notes.is_none()
    }
}

impl SyncRecord for Appointment {
    type Id = AppointmentId;
    type Scope = AppointmentScope;
    type Draft = AppointmentDraft;
    type Patch = AppointmentPatch;

    fn id(&self) -> &AppointmentId {
        &self.id
    }

    fn in_scope(&self, scope: &AppointmentScope) -> bool {
        match scope {
            AppointmentScope::All => true,
            AppointmentScope::Patient(patient_id) => &self.patient_id == patient_id,
        }
    }

    fn apply_patch(&mut self, patch: &AppointmentPatch) {
        if let Some(specialty) = &patch.specialty {
            self.specialty = specialty.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(reference_date) = patch.reference_date {
            self.reference_date = Some(reference_date);
        }
        if let Some(diagnosis) = &patch.diagnosis {
            self.diagnosis = Some(diagnosis.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }

    fn from_draft(id: AppointmentId, draft: AppointmentDraft) -> Result<Self, String> {
        if draft.specialty.trim().is_empty() {
            return Err("appointment specialty must not be empty".into());
        }
        Ok(Self {
            id,
            patient_id: draft.patient_id,
            specialty: draft.specialty,
            status: AppointmentStatus::Scheduled,
            reference_date: draft.reference_date,
            diagnosis: draft.diagnosis,
            notes: draft.notes,
        })
    }

    fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }

    fn summary_label(&self) -> String {
        self.specialty.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_supplied_fields() {
        let mut appointment = Appointment::new(
            AppointmentId::from("apt_1"),
            PatientId::from("p1"),
            "Cardiology",
            NaiveDate::from_ymd_opt(2024, 1, 1),
        );
        appointment.apply_patch(&AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            ..Default::default()
        });

        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(appointment.specialty, "Cardiology");
        assert_eq!(
            appointment.reference_date,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn scope_filters_by_patient() {
        let appointment = Appointment::new(
            AppointmentId::from("apt_1"),
            PatientId::from("p1"),
            "Cardiology",
            None,
        );
        assert!(appointment.in_scope(&AppointmentScope::All));
        assert!(appointment.in_scope(&AppointmentScope::Patient(PatientId::from("p1"))));
        assert!(!appointment.in_scope(&AppointmentScope::Patient(PatientId::from("p2"))));
    }
}
