//! Handles to in-flight asynchronous operations.

use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::Result;

/// A pending operation returned by an asynchronous launch or transfer.
///
/// Owned by whoever requested it; the queue keeps no implicit reference.
/// There is no cancellation and no timeout: callers wanting bounded waits
/// wrap [`AsyncOp::wait`] themselves.
pub trait AsyncOp: Send + Sync + fmt::Debug {
    /// Whether the operation has completed (successfully or not).
    fn is_ready(&self) -> bool;

    /// Block until the operation completes and return its outcome.
    fn wait(&self) -> Result<()>;
}

/// A one-shot completion signal, `pending → complete`.
///
/// Backends hand one out per asynchronous submission and call
/// [`Completion::complete`] from whichever thread finishes the work.
pub struct Completion {
    outcome: Mutex<Option<Result<()>>>,
    ready: Condvar,
}

impl Completion {
    /// A completion that is still pending.
    pub fn pending() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// A completion that has already finished with `outcome`.
    pub fn finished(outcome: Result<()>) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            ready: Condvar::new(),
        }
    }

    /// Record the outcome and wake every waiter.
    ///
    /// Only the first call has an effect; an operation completes once.
    pub fn complete(&self, outcome: Result<()>) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.ready.notify_all();
        }
    }
}

impl AsyncOp for Completion {
    fn is_ready(&self) -> bool {
        self.outcome.lock().is_some()
    }

    fn wait(&self) -> Result<()> {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("ready", &self.is_ready())
            .finish()
    }
}
