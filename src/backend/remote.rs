//! # Channel-Backed Record Store
//!
//! An in-memory stand-in for the clinic backend. The store owns the rows for
//! one record type and processes requests sequentially from an mpsc channel,
//! so it needs no locks: exclusive ownership inside the task is the whole
//! concurrency story.
//!
//! Production deployments replace [`StoreClient`] with a real transport; the
//! engine only ever sees the [`RecordBackend`] trait. Integration tests and
//! demos run against this store to exercise full round trips.

use crate::backend::api::{BackendError, RecordBackend};
use crate::record::SyncRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Type alias for the one-shot response channel used by the store task.
pub type Response<V> = oneshot::Sender<Result<V, BackendError>>;

/// Request vocabulary understood by a [`RecordStore`].
///
/// The variants mirror the [`RecordBackend`] surface one-to-one; associated
/// types from [`SyncRecord`] keep every payload typed to its record.
#[derive(Debug)]
pub enum StoreRequest<T: SyncRecord> {
    FetchCollection {
        scope: T::Scope,
        respond_to: Response<Vec<T>>,
    },
    FetchById {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Create {
        draft: T::Draft,
        respond_to: Response<T>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
}

/// The server half: owns the rows and the receiving end of the channel.
///
/// # Concurrency Model
/// One store task per record type, processing messages sequentially. Sibling
/// requests from a bulk commit interleave at the channel, never inside a
/// request.
pub struct RecordStore<T: SyncRecord> {
    receiver: mpsc::Receiver<StoreRequest<T>>,
    rows: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: SyncRecord> RecordStore<T> {
    /// Creates a store and its connected [`StoreClient`].
    ///
    /// `next_id_fn` is injected so each deployment controls its own id
    /// scheme (tests use a counter closure, see `tests/session_test.rs`).
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, StoreClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            rows: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (store, StoreClient { sender })
    }

    /// Seeds a row directly, bypassing the create path. Test setup only.
    pub fn seed(&mut self, record: T) {
        self.rows.insert(record.id().clone(), record);
    }

    /// Runs the store's event loop until every client is dropped.
    pub async fn run(mut self) {
        let record_type = std::any::type_name::<T>().split("::").last().unwrap_or("Unknown");
        info!(record_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::FetchCollection { scope, respond_to } => {
                    let matches: Vec<T> = self
                        .rows
                        .values()
                        .filter(|row| row.in_scope(&scope))
                        .cloned()
                        .collect();
                    debug!(record_type, ?scope, count = matches.len(), "FetchCollection");
                    let _ = respond_to.send(Ok(matches));
                }
                StoreRequest::FetchById { id, respond_to } => {
                    let row = self.rows.get(&id).cloned();
                    debug!(record_type, %id, found = row.is_some(), "FetchById");
                    let _ = respond_to.send(Ok(row));
                }
                StoreRequest::Create { draft, respond_to } => {
                    debug!(record_type, ?draft, "Create");
                    let id = (self.next_id_fn)();
                    match T::from_draft(id.clone(), draft) {
                        Ok(row) => {
                            self.rows.insert(id.clone(), row.clone());
                            info!(record_type, %id, size = self.rows.len(), "Created");
                            let _ = respond_to.send(Ok(row));
                        }
                        Err(e) => {
                            warn!(record_type, error = %e, "Create rejected");
                            let _ = respond_to.send(Err(BackendError::Rejected(e)));
                        }
                    }
                }
                StoreRequest::Update { id, patch, respond_to } => {
                    debug!(record_type, %id, ?patch, "Update");
                    if let Some(row) = self.rows.get_mut(&id) {
                        row.apply_patch(&patch);
                        info!(record_type, %id, "Updated");
                        let _ = respond_to.send(Ok(row.clone()));
                    } else {
                        warn!(record_type, %id, "Not found");
                        let _ = respond_to.send(Err(BackendError::NotFound(id.to_string())));
                    }
                }
                StoreRequest::Delete { id, respond_to } => {
                    debug!(record_type, %id, "Delete");
                    if self.rows.remove(&id).is_some() {
                        info!(record_type, %id, size = self.rows.len(), "Deleted");
                        let _ = respond_to.send(Ok(()));
                    } else {
                        warn!(record_type, %id, "Not found");
                        let _ = respond_to.send(Err(BackendError::NotFound(id.to_string())));
                    }
                }
            }
        }

        info!(record_type, size = self.rows.len(), "Store shutdown");
    }
}

/// The client half: cheap to clone, holds only the sender.
#[derive(Clone)]
pub struct StoreClient<T: SyncRecord> {
    sender: mpsc::Sender<StoreRequest<T>>,
}

impl<T: SyncRecord> StoreClient<T> {
    async fn roundtrip<V>(
        &self,
        build: impl FnOnce(Response<V>) -> StoreRequest<T>,
    ) -> Result<V, BackendError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| BackendError::ChannelClosed)?;
        response.await.map_err(|_| BackendError::ChannelDropped)?
    }
}

#[async_trait]
impl<T: SyncRecord> RecordBackend<T> for StoreClient<T> {
    async fn fetch_collection(&self, scope: T::Scope) -> Result<Vec<T>, BackendError> {
        self.roundtrip(|respond_to| StoreRequest::FetchCollection { scope, respond_to })
            .await
    }

    async fn fetch_by_id(&self, id: T::Id) -> Result<Option<T>, BackendError> {
        self.roundtrip(|respond_to| StoreRequest::FetchById { id, respond_to })
            .await
    }

    async fn create(&self, draft: T::Draft) -> Result<T, BackendError> {
        self.roundtrip(|respond_to| StoreRequest::Create { draft, respond_to })
            .await
    }

    async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, BackendError> {
        self.roundtrip(|respond_to| StoreRequest::Update { id, patch, respond_to })
            .await
    }

    async fn delete(&self, id: T::Id) -> Result<(), BackendError> {
        self.roundtrip(|respond_to| StoreRequest::Delete { id, respond_to })
            .await
    }
}
