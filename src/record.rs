//! # SyncRecord Trait
//!
//! The `SyncRecord` trait defines the contract that every remote record type
//! (Patient, Appointment, Pendency) must implement to be managed by the
//! engine: caches, edit journals, bulk commits, and draft staging are all
//! written once, generically, against this trait.
//!
//! # Architecture Note
//! We use associated types (`Id`, `Scope`, `Draft`, `Patch`) to enforce type
//! safety end to end. An `Appointment` journal only accepts an
//! `AppointmentPatch`, and a draft can never masquerade as a persisted row,
//! because the temporary id lives in a different type entirely
//! (see [`crate::engine::staging::DraftId`]).

use chrono::NaiveDate;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A field-level update payload.
///
/// Patches carry `Option` fields: only the supplied fields change, the rest
/// retain their prior values. `merge_from` layers a newer patch over an older
/// one with last-write-wins semantics per field.
pub trait FieldPatch: Clone + Default + Send + Sync + Debug {
    /// Layer `newer` over `self`: every field `newer` supplies replaces the
    /// corresponding field of `self`.
    fn merge_from(&mut self, newer: Self);

    /// True when the patch supplies no fields at all.
    fn is_empty(&self) -> bool;
}

/// Trait that any remote record must implement to be managed by the engine.
///
/// # Async & Ownership
/// The trait itself is synchronous: records are plain data. All I/O lives
/// behind [`crate::backend::RecordBackend`], and the engine components own
/// their record state exclusively, so no locking is required inside a record.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    /// The server-assigned identifier (e.g. `AppointmentId`).
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The collection filter this record type supports (e.g. "all rows" or
    /// "rows of one patient"). Doubles as the collection cache key.
    type Scope: Eq + Hash + Clone + Send + Sync + Debug;

    /// The payload required to create a new instance (a staged draft).
    type Draft: Clone + Send + Sync + Debug;

    /// The field-level update payload.
    type Patch: FieldPatch;

    fn id(&self) -> &Self::Id;

    /// Whether this record belongs to the given collection scope.
    fn in_scope(&self, scope: &Self::Scope) -> bool;

    /// Merge the supplied fields of `patch` into this record.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Construct the full record from a server-assigned id and a draft
    /// payload. Called on the store side when a draft is materialized.
    fn from_draft(id: Self::Id, draft: Self::Draft) -> Result<Self, String>;

    /// The calendar date this record is anchored to, when it has one.
    /// Used by conflict detection; records without a parseable date are
    /// skipped pair-wise.
    fn reference_date(&self) -> Option<NaiveDate> {
        None
    }

    /// Short human-readable label for warnings and conflict listings.
    fn summary_label(&self) -> String {
        self.id().to_string()
    }
}
