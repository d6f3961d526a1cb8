//! # clinic-sync
//!
//! > **Client-side synchronization and reconciliation for clinic-operations dashboards.**
//!
//! This crate keeps client-held copies of remote patient, appointment, and
//! pendency records consistent with a backend of record while supporting
//! optimistic per-row editing and bulk commit. It is the engine underneath
//! the dashboard grid: rendering, dialogs, and routing live elsewhere and
//! the remote API is consumed as a black box.
//!
//! ## Core Concepts
//!
//! ### Generics: The Power of `T`
//! You'll see `RecordWorkspace<T: SyncRecord>` everywhere. The caching,
//! journaling, and commit machinery is written **once** and works for
//! Patients, Appointments, and Pendencies alike; associated types keep every
//! payload bound to its record, so an `AppointmentPatch` can never reach a
//! pendency row.
//!
//! ### Optimistic Editing
//! Edits land in an [`engine::EditJournal`] as field-level patches layered
//! over a local snapshot. Nothing touches the network until a bulk commit
//! fans the patches out concurrently and joins settle-all: one failing row
//! never cancels or hides its siblings, and failed rows stay dirty and
//! retryable.
//!
//! ### Drafts Are Not Records
//! Proposed rows carry a [`engine::DraftId`] (uuid), a different type from
//! every server-assigned id. The compiler rules out a draft being written
//! into the by-id cache slot of a real record.
//!
//! ## Module Tour
//!
//! ### 1. The Contract ([`record`])
//! [`record::SyncRecord`] is what a domain type implements to be managed by
//! the engine; [`record::FieldPatch`] gives update payloads last-write-wins
//! field merging.
//!
//! ### 2. The Engine ([`engine`])
//! The generic core: [`engine::ReadThroughCache`] (single-flight reads),
//! [`engine::EditJournal`] (dirty tracking), [`engine::BulkCommitCoordinator`]
//! (settle-all commits), [`engine::DraftConflictDetector`] (day-window
//! overlap checks), and [`engine::DraftStagingPipeline`] (editable drafts).
//!
//! ### 3. The Boundary ([`backend`])
//! [`backend::RecordBackend`] is the black-box remote API. A channel-backed
//! in-memory store ([`backend::RecordStore`]) and an expectation-driven mock
//! ([`backend::MockBackend`]) ship with the crate for tests and demos.
//!
//! ### 4. The Interface ([`workspace`], [`session`])
//! [`workspace::RecordWorkspace`] wires one record type's caches, journal,
//! and coordinator to its backend. [`session::SyncSession`] owns the three
//! workspaces plus the draft pipeline and the confirmation gate, and is the
//! single surface the presentation layer talks to.
//!
//! ### 5. The Domain ([`records`])
//! Concrete clinic records with their id newtypes, draft payloads, and
//! patch payloads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clinic_sync::records::{AppointmentDraft, PatientId};
//! use clinic_sync::session::ClinicSystem;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut system = ClinicSystem::new();
//!     let patient = PatientId::from("pat_1");
//!
//!     system.session.select_patient(Some(patient.clone()));
//!     let warnings = system.session.check_draft_conflicts("2024-05-10").await.unwrap();
//!     if !warnings.has_conflict() {
//!         system.session
//!             .stage_drafts(vec![AppointmentDraft::new(patient, "Cardiology", None)])
//!             .unwrap();
//!         system.session.commit_drafts().await.unwrap();
//!     }
//!     system.shutdown().await.unwrap();
//! }
//! ```
//!
//! ## Observability
//!
//! Everything logs through `tracing` with structured fields. Call
//! [`session::setup_tracing`] once at startup and drive verbosity with
//! `RUST_LOG` (`info` for operational lines, `debug` for payloads and cache
//! traffic).

pub mod backend;
pub mod engine;
pub mod record;
pub mod records;
pub mod session;
pub mod workspace;
