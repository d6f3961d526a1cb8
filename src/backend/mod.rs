//! Remote-store boundary: the [`RecordBackend`] trait the engine consumes,
//! plus the two implementations shipped with the crate (the channel-backed
//! in-memory store and the expectation-driven mock).

pub mod api;
pub mod mock;
pub mod remote;

pub use api::{BackendError, RecordBackend};
pub use mock::MockBackend;
pub use remote::{RecordStore, StoreClient, StoreRequest};
