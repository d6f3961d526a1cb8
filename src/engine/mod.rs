//! The synchronization core: read-through caching, edit journaling,
//! settle-all bulk commits, draft staging, and temporal conflict detection.
//! Everything here is generic over [`crate::record::SyncRecord`] and free of
//! domain knowledge; the concrete clinic records live in [`crate::records`].

pub mod cache;
pub mod commit;
pub mod conflict;
pub mod error;
pub mod journal;
pub mod staging;

pub use cache::{CacheEntry, ReadThroughCache};
pub use commit::{BulkCommitCoordinator, BulkCommitReport, CommitDecision, CommitOutcome};
pub use conflict::{
    ConflictEntry, ConflictReport, DraftConflictDetector, CONFLICT_WINDOW_DAYS,
    MAX_LISTED_CONFLICTS,
};
pub use error::SyncError;
pub use journal::{EditEntry, EditJournal, EditPhase};
pub use staging::{Draft, DraftCommitReport, DraftId, DraftPhase, DraftStagingPipeline};
