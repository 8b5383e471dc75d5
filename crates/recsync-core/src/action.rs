//! Loading and error bookkeeping shared by every container.
//!
//! [`AsyncActions::run`] wraps one unit of async work. On entry it clears
//! the container's errors and bumps the in-flight counter; on exit it
//! decrements the counter and, when the work failed, replaces the error list
//! with that single failure. The returned future never fails.
//!
//! # Known hazard
//!
//! Errors are cleared when *any* action starts, not per action. Two actions
//! dispatched back to back on one container can therefore clobber each
//! other's error: a failure recorded by the first is wiped by the start of
//! the second, and a later failure replaces an earlier one outright.

use std::cell::{Cell, RefCell};
use std::future::Future;

use crate::error::SyncError;

/// Stable identity of a recorded error, used for dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorId(u64);

/// An error surfaced to the UI together with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedError {
    pub id: ErrorId,
    pub error: SyncError,
}

/// Snapshot of a container's action bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionState {
    pub errors: Vec<RecordedError>,
    pub loading: usize,
}

/// Per-container action tracker.
#[derive(Debug, Default)]
pub struct AsyncActions {
    state: RefCell<ActionState>,
    next_error: Cell<u64>,
}

impl AsyncActions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work`, recording its failure instead of returning it.
    pub async fn run<F>(&self, work: F)
    where
        F: Future<Output = Result<(), SyncError>>,
    {
        {
            let mut state = self.state.borrow_mut();
            state.errors.clear();
            state.loading += 1;
        }
        let _guard = LoadingGuard { state: &self.state };

        if let Err(error) = work.await {
            tracing::warn!(code = %error.code(), error = %error, "action failed");
            self.record(error);
        }
    }

    fn record(&self, error: SyncError) {
        let id = ErrorId(self.next_error.get());
        self.next_error.set(id.0 + 1);
        self.state.borrow_mut().errors = vec![RecordedError { id, error }];
    }

    /// Number of actions currently in flight.
    #[must_use]
    pub fn loading(&self) -> usize {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading() > 0
    }

    /// Errors currently visible, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<SyncError> {
        self.state
            .borrow()
            .errors
            .iter()
            .map(|recorded| recorded.error.clone())
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> ActionState {
        self.state.borrow().clone()
    }

    /// Remove every error whose text equals `message`.
    ///
    /// Distinct failures that render the same text are removed together;
    /// use [`Self::dismiss_id`] to target a single entry.
    pub fn dismiss(&self, message: &str) {
        self.state
            .borrow_mut()
            .errors
            .retain(|recorded| recorded.error.to_string() != message);
    }

    pub fn dismiss_id(&self, id: ErrorId) {
        self.state
            .borrow_mut()
            .errors
            .retain(|recorded| recorded.id != id);
    }
}

struct LoadingGuard<'a> {
    state: &'a RefCell<ActionState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.loading = state.loading.saturating_sub(1);
    }
}
