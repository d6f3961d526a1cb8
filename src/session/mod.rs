//! Session lifecycle: the injectable per-session store, the confirmation
//! gate, the in-memory runtime harness, and observability setup.

pub mod confirm;
pub mod session;
pub mod tracing;

pub use confirm::{AutoConfirm, ConfirmGate, ScriptedConfirm};
pub use session::{ClinicSystem, SyncSession};
pub use tracing::setup_tracing;
