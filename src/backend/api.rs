//! # Backend API Surface
//!
//! This module defines the boundary between the engine and the clinic
//! backend. The engine consumes the remote API as a black box: every remote
//! read and write goes through [`RecordBackend`], and every failure surfaces
//! as a [`BackendError`].
//!
//! Two implementations ship with the crate:
//! - [`crate::backend::StoreClient`]: a channel-backed in-memory store used
//!   by integration tests and demos.
//! - [`crate::backend::MockBackend`]: an expectation-driven test double for
//!   unit-testing engine logic, including injected failures.

use crate::record::SyncRecord;
use async_trait::async_trait;

/// Transport-level errors raised by a backend implementation.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum BackendError {
    #[error("backend connection closed")]
    ChannelClosed,
    #[error("backend dropped response channel")]
    ChannelDropped,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("rejected by backend: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The remote read/write surface for one record type.
///
/// # Contract
/// Each call is independent; idempotency is NOT assumed, so the engine never
/// retries automatically. Failures are reported to the caller, which decides
/// on user-facing handling.
#[async_trait]
pub trait RecordBackend<T: SyncRecord>: Send + Sync {
    /// Fetch every record matching `scope`.
    async fn fetch_collection(&self, scope: T::Scope) -> Result<Vec<T>, BackendError>;

    /// Fetch a single record by id. A read miss is `Ok(None)`, not an error.
    async fn fetch_by_id(&self, id: T::Id) -> Result<Option<T>, BackendError>;

    /// Materialize a draft into a persisted record with a server-assigned id.
    async fn create(&self, draft: T::Draft) -> Result<T, BackendError>;

    /// Apply a field-level patch and return the updated record.
    async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, BackendError>;

    /// Remove a record permanently.
    async fn delete(&self, id: T::Id) -> Result<(), BackendError>;
}
