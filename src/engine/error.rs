//! Engine-level error taxonomy.
//!
//! Transport failures bubble up from [`BackendError`]; everything else is
//! raised by the engine itself before or after I/O. `PartialCommit` is never
//! downgraded: a bulk commit with any failed item always surfaces the count.

use crate::backend::BackendError;

/// Errors surfaced to the presentation layer by the sync engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SyncError {
    /// A single remote read or write failed. Reported, never auto-retried.
    #[error("transport failure: {0}")]
    Transport(#[from] BackendError),

    /// A precondition failed before any request was issued (e.g. no patient
    /// selected for a draft operation).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Aggregate bulk-commit result: some items failed while others
    /// succeeded. The failed rows remain dirty and editable.
    #[error("{failed} of {total} records failed to commit")]
    PartialCommit { failed: usize, total: usize },

    /// A forced reload failed; the previously cached value is still being
    /// served untouched.
    #[error("refresh failed for {key}, keeping last known value: {source}")]
    StaleRead {
        key: String,
        #[source]
        source: BackendError,
    },
}
