//! Deferred-execution scheduling — the pluggable "run later" primitive
//!
//! The pump never drains its queue inside `publish` or `subscribe`; it
//! asks a [`Scheduler`] to run the drain once, later, after the current
//! unit of work. Backends implement `Scheduler` to plug in their own
//! notion of "later":
//!
//! - [`TokioScheduler`] — spawns each job onto a tokio runtime
//! - [`ManualScheduler`] — deterministic FIFO queue driven explicitly,
//!   for tests and embedders that own their own loop

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A deferred unit of work
pub type Job = Box<dyn FnOnce() + Send>;

/// Single-shot deferred execution
///
/// Implementations run each job exactly once, after the call stack that
/// scheduled it has unwound, preserving FIFO order of multiple
/// `schedule` calls.
pub trait Scheduler: Send + Sync {
    /// Run `job` once, later
    fn schedule(&self, job: Job);
}

/// Scheduler backed by a tokio runtime
///
/// Each job becomes its own task on the captured runtime handle.
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Schedule onto an explicit runtime handle
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Schedule onto the runtime of the calling context
    ///
    /// Panics outside a tokio runtime, like [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Deterministic scheduler driven by explicit calls
///
/// Jobs accumulate in FIFO order until the owner calls
/// [`run_pending`](ManualScheduler::run_pending). Clones share the same
/// queue, so a test can hand one clone to the pump and keep another to
/// drive it.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run queued jobs in FIFO order until none remain
    ///
    /// Jobs scheduled by a running job are executed in the same call.
    pub fn run_pending(&self) {
        loop {
            let job = self
                .jobs
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();
            match job {
                Some(job) => job(),
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, job: Job) {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(job);
    }
}
