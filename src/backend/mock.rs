//! # Mock Backend
//!
//! `MockBackend<T>` implements the same [`RecordBackend`] surface as the
//! production transport but operates entirely in-memory against a queue of
//! expectations. It exists to unit-test engine logic deterministically,
//! including failure injection that is hard to reproduce against a real
//! store (timeouts, partial bulk failures).
//!
//! # Matching discipline
//! Expectations that target a specific row (`expect_update`,
//! `expect_fetch_by_id`, `expect_delete`) are matched by operation kind AND
//! id, not by strict arrival order: bulk commits issue sibling requests with
//! no ordering guarantee, so FIFO matching would be flaky. Id-less
//! expectations (`expect_create`, `expect_fetch_collection`) are consumed in
//! the order they were registered.
//!
//! ```ignore
//! let mock = MockBackend::<Pendency>::new();
//! mock.expect_update(PendencyId::from("pend_1")).return_ok(updated);
//! mock.expect_update(PendencyId::from("pend_2"))
//!     .return_err(BackendError::Transport("connection reset".into()));
//!
//! // drive the engine against mock.clone() ...
//! mock.verify(); // panics if any expectation was never consumed
//! ```

use crate::backend::api::{BackendError, RecordBackend};
use crate::record::SyncRecord;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Expectation<T: SyncRecord> {
    FetchCollection {
        scope: Option<T::Scope>,
        response: Result<Vec<T>, BackendError>,
    },
    FetchById {
        id: T::Id,
        response: Result<Option<T>, BackendError>,
    },
    Create {
        response: Result<T, BackendError>,
    },
    Update {
        id: T::Id,
        response: Result<T, BackendError>,
    },
    Delete {
        id: T::Id,
        response: Result<(), BackendError>,
    },
}

/// An expectation-driven [`RecordBackend`] test double.
///
/// Cloning shares the underlying queue, so tests keep one handle for
/// `expect_*`/`verify` and hand a clone to the engine.
pub struct MockBackend<T: SyncRecord> {
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> Clone for MockBackend<T> {
    fn clone(&self) -> Self {
        Self {
            expectations: self.expectations.clone(),
        }
    }
}

impl<T: SyncRecord> Default for MockBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SyncRecord> MockBackend<T> {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Expects a collection fetch for any scope.
    pub fn expect_fetch_collection(&self) -> FetchCollectionExpectation<T> {
        FetchCollectionExpectation {
            scope: None,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a collection fetch for one specific scope.
    pub fn expect_fetch_scope(&self, scope: T::Scope) -> FetchCollectionExpectation<T> {
        FetchCollectionExpectation {
            scope: Some(scope),
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a by-id fetch.
    pub fn expect_fetch_by_id(&self, id: T::Id) -> FetchByIdExpectation<T> {
        FetchByIdExpectation {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a create. Consumed in registration order.
    pub fn expect_create(&self) -> CreateExpectation<T> {
        CreateExpectation {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an update of one specific row.
    pub fn expect_update(&self, id: T::Id) -> UpdateExpectation<T> {
        UpdateExpectation {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a delete of one specific row.
    pub fn expect_delete(&self, id: T::Id) -> DeleteExpectation<T> {
        DeleteExpectation {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Panics unless every registered expectation was consumed.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("not all backend expectations were met, {} remaining", exps.len());
        }
    }

    fn take_matching(
        &self,
        describe: &str,
        matches: impl Fn(&Expectation<T>) -> bool,
    ) -> Expectation<T> {
        let mut exps = self.expectations.lock().unwrap();
        match exps.iter().position(matches) {
            Some(pos) => exps.remove(pos).unwrap(),
            None => panic!("unexpected backend call: {describe}"),
        }
    }
}

#[async_trait]
impl<T: SyncRecord> RecordBackend<T> for MockBackend<T> {
    async fn fetch_collection(&self, scope: T::Scope) -> Result<Vec<T>, BackendError> {
        let exp = self.take_matching(&format!("fetch_collection({scope:?})"), |e| {
            matches!(e, Expectation::FetchCollection { scope: s, .. }
                if s.as_ref().map_or(true, |s| *s == scope))
        });
        match exp {
            Expectation::FetchCollection { response, .. } => response,
            _ => unreachable!(),
        }
    }

    async fn fetch_by_id(&self, id: T::Id) -> Result<Option<T>, BackendError> {
        let exp = self.take_matching(&format!("fetch_by_id({id})"), |e| {
            matches!(e, Expectation::FetchById { id: i, .. } if *i == id)
        });
        match exp {
            Expectation::FetchById { response, .. } => response,
            _ => unreachable!(),
        }
    }

    async fn create(&self, _draft: T::Draft) -> Result<T, BackendError> {
        let exp = self.take_matching("create(..)", |e| matches!(e, Expectation::Create { .. }));
        match exp {
            Expectation::Create { response } => response,
            _ => unreachable!(),
        }
    }

    async fn update(&self, id: T::Id, _patch: T::Patch) -> Result<T, BackendError> {
        let exp = self.take_matching(&format!("update({id})"), |e| {
            matches!(e, Expectation::Update { id: i, .. } if *i == id)
        });
        match exp {
            Expectation::Update { response, .. } => response,
            _ => unreachable!(),
        }
    }

    async fn delete(&self, id: T::Id) -> Result<(), BackendError> {
        let exp = self.take_matching(&format!("delete({id})"), |e| {
            matches!(e, Expectation::Delete { id: i, .. } if *i == id)
        });
        match exp {
            Expectation::Delete { response, .. } => response,
            _ => unreachable!(),
        }
    }
}

/// Builder for collection-fetch expectations.
pub struct FetchCollectionExpectation<T: SyncRecord> {
    scope: Option<T::Scope>,
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> FetchCollectionExpectation<T> {
    pub fn return_ok(self, rows: Vec<T>) {
        self.push(Ok(rows));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Vec<T>, BackendError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::FetchCollection {
                scope: self.scope,
                response,
            });
    }
}

/// Builder for by-id fetch expectations.
pub struct FetchByIdExpectation<T: SyncRecord> {
    id: T::Id,
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> FetchByIdExpectation<T> {
    pub fn return_ok(self, row: Option<T>) {
        self.push(Ok(row));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<T>, BackendError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::FetchById { id: self.id, response });
    }
}

/// Builder for create expectations.
pub struct CreateExpectation<T: SyncRecord> {
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> CreateExpectation<T> {
    pub fn return_ok(self, created: T) {
        self.push(Ok(created));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, BackendError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Create { response });
    }
}

/// Builder for update expectations.
pub struct UpdateExpectation<T: SyncRecord> {
    id: T::Id,
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> UpdateExpectation<T> {
    pub fn return_ok(self, updated: T) {
        self.push(Ok(updated));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, BackendError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Update { id: self.id, response });
    }
}

/// Builder for delete expectations.
pub struct DeleteExpectation<T: SyncRecord> {
    id: T::Id,
    expectations: Arc<Mutex<VecDeque<Expectation<T>>>>,
}

impl<T: SyncRecord> DeleteExpectation<T> {
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<(), BackendError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Delete { id: self.id, response });
    }
}
