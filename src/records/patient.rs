//! Patient roster records.

use crate::record::{FieldPatch, SyncRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned patient identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientId(String);

impl From<&str> for PatientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PatientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub document: String,
    pub birth_date: Option<NaiveDate>,
}

impl Patient {
    pub fn new(
        id: impl Into<PatientId>,
        name: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            document: document.into(),
            birth_date: None,
        }
    }
}

/// Collection filter for the patient roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatientScope {
    All,
}

/// Payload for registering a new patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub document: String,
    pub birth_date: Option<NaiveDate>,
}

/// Field-level patient update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub document: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl FieldPatch for PatientPatch {
    fn merge_from(&mut self, newer: Self) {
        if newer.name.is_some() {
            self.name = newer.name;
        }
        if newer.document.is_some() {
            self.document = newer.document;
        }
        if newer.birth_date.is_some() {
            self.birth_date = newer.birth_date;
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.document.is_none() && self.birth_date.is_none()
    }
}

impl SyncRecord for Patient {
    type Id = PatientId;
    type Scope = PatientScope;
    type Draft = PatientDraft;
    type Patch = PatientPatch;

    fn id(&self) -> &PatientId {
        &self.id
    }

    fn in_scope(&self, _scope: &PatientScope) -> bool {
        true
    }

    fn apply_patch(&mut self, patch: &PatientPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(document) = &patch.document {
            self.document = document.clone();
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = Some(birth_date);
        }
    }

    fn from_draft(id: PatientId, draft: PatientDraft) -> Result<Self, String> {
        if draft.name.trim().is_empty() {
            return Err("patient name must not be empty".into());
        }
        Ok(Self {
            id,
            name: draft.name,
            document: draft.document,
            birth_date: draft.birth_date,
        })
    }

    fn summary_label(&self) -> String {
        self.name.clone()
    }
}
