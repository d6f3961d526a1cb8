//! Pendency records: outstanding administrative items (missing documents,
//! unsigned forms, unpaid slips) tracked per patient and resolved in bulk
//! from the dashboard.

use crate::record::{FieldPatch, SyncRecord};
use crate::records::patient::PatientId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned pendency identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendencyId(String);

impl From<&str> for PendencyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PendencyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PendencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendencyStatus {
    Open,
    InProgress,
    Resolved,
}

impl fmt::Display for PendencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PendencyStatus::Open => "open",
            PendencyStatus::InProgress => "in progress",
            PendencyStatus::Resolved => "resolved",
        };
        write!(f, "{label}")
    }
}

/// An outstanding administrative item for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct Pendency {
    pub id: PendencyId,
    pub patient_id: PatientId,
    pub description: String,
    pub status: PendencyStatus,
    pub due_date: Option<NaiveDate>,
}

impl Pendency {
    pub fn new(
        id: impl Into<PendencyId>,
        patient_id: impl Into<PatientId>,
        description: impl Into<String>,
        due_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: id.into(),
            patient_id: patient_id.into(),
            description: description.into(),
            status: PendencyStatus::Open,
            due_date,
        }
    }
}

/// Collection filter: all pendencies or one patient's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendencyScope {
    All,
    Patient(PatientId),
}

/// Payload for opening a new pendency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendencyDraft {
    pub patient_id: PatientId,
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

/// Field-level pendency update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendencyPatch {
    pub description: Option<String>,
    pub status: Option<PendencyStatus>,
    pub due_date: Option<NaiveDate>,
}

impl FieldPatch for PendencyPatch {
    fn merge_from(&mut self, newer: Self) {
        if newer.description.is_some() {
            self.description = newer.description;
        }
        if newer.status.is_some() {
            self.status = newer.status;
        }
        if newer.due_date.is_some() {
            self.due_date = newer.due_date;
        }
    }

    fn is_empty(&self) -> bool {
        self.description.is_none() && self.status.is_none() && self.due_date.is_none()
    }
}

impl SyncRecord for Pendency {
    type Id = PendencyId;
    type Scope = PendencyScope;
    type Draft = PendencyDraft;
    type Patch = PendencyPatch;

    fn id(&self) -> &PendencyId {
        &self.id
    }

    fn in_scope(&self, scope: &PendencyScope) -> bool {
        match scope {
            PendencyScope::All => true,
            PendencyScope::Patient(patient_id) => &self.patient_id == patient_id,
        }
    }

    fn apply_patch(&mut self, patch: &PendencyPatch) {
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
    }

    fn from_draft(id: PendencyId, draft: PendencyDraft) -> Result<Self, String> {
        if draft.description.trim().is_empty() {
            return Err("pendency description must not be empty".into());
        }
        Ok(Self {
            id,
            patient_id: draft.patient_id,
            description: draft.description,
            status: PendencyStatus::Open,
            due_date: draft.due_date,
        })
    }

    fn reference_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    fn summary_label(&self) -> String {
        self.description.clone()
    }
}
