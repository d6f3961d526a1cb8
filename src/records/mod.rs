//! Concrete clinic record types managed by the engine.

pub mod appointment;
pub mod patient;
pub mod pendency;

pub use appointment::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentPatch, AppointmentScope,
    AppointmentStatus,
};
pub use patient::{Patient, PatientDraft, PatientId, PatientPatch, PatientScope};
pub use pendency::{Pendency, PendencyDraft, PendencyId, PendencyPatch, PendencyScope, PendencyStatus};
