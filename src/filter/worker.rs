//! Dedicated worker thread behind every asynchronous filter.
//!
//! [`AsyncWorker`] owns at most one in-flight job.  The job closure runs on
//! its own OS thread and polls a [`CancelToken`]; the owning filter reads
//! the result through a mutex-guarded slot and a condition variable.
//!
//! # Job lifecycle
//!
//! ```text
//! start(work) ──▶ stop + join previous job ──▶ generation += 1, Filtering
//!                                              │
//!        worker thread: work(&cancel) ─────────┤
//!                                              ├─ Some(outcome) ─▶ Finished  (Finished event)
//!                                              └─ None / cancel ─▶ Idle      (Stopped event)
//! ```
//!
//! A job that was superseded or stopped never writes to the slot; the
//! generation counter guarantees stale results are dropped.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::{FilterEvent, FilterState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag shared between a filter and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Has [`AsyncWorker::stop`] been called for this job?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// JobOutcome
// ---------------------------------------------------------------------------

/// What a finished job hands back to its filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Converted text.
    pub output: String,
    /// Whether the conversion changed the text.
    pub modified: bool,
}

// ---------------------------------------------------------------------------
// Shared slot
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum JobState {
    Idle,
    Filtering,
    Finished(JobOutcome),
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    state: JobState,
    cancel: CancelToken,
    modified: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    done: Condvar,
    listeners: Mutex<Vec<mpsc::UnboundedSender<FilterEvent>>>,
}

impl Shared {
    fn publish(&self, event: FilterEvent) {
        lock(&self.listeners).retain(|tx| tx.send(event).is_ok());
    }
}

// ---------------------------------------------------------------------------
// AsyncWorker
// ---------------------------------------------------------------------------

/// Runs one conversion at a time on a dedicated thread.
pub struct AsyncWorker {
    name: String,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncWorker {
    /// Create an idle worker.  `name` prefixes the worker thread's name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    generation: 0,
                    state: JobState::Idle,
                    cancel: CancelToken::default(),
                    modified: false,
                }),
                done: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Launch `work` on a fresh worker thread.
    ///
    /// Any job still in flight is stopped and joined first, so at most one
    /// conversion runs per worker.
    pub fn start<F>(&self, work: F)
    where
        F: FnOnce(&CancelToken) -> Option<JobOutcome> + Send + 'static,
    {
        self.stop();
        let previous = lock(&self.handle).take();
        if let Some(previous) = previous {
            let _ = previous.join();
        }

        let (generation, cancel) = {
            let mut slot = lock(&self.shared.slot);
            slot.generation += 1;
            slot.cancel = CancelToken::default();
            slot.state = JobState::Filtering;
            slot.modified = false;
            (slot.generation, slot.cancel.clone())
        };

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(format!("{}-worker", self.name))
            .spawn(move || run_job(&shared, generation, &cancel, work));

        match spawned {
            Ok(handle) => *lock(&self.handle) = Some(handle),
            Err(e) => {
                log::error!("{}: cannot spawn worker thread: {e}", self.name);
                let mut slot = lock(&self.shared.slot);
                if slot.generation == generation {
                    slot.state = JobState::Idle;
                }
                drop(slot);
                self.shared.done.notify_all();
                self.shared.publish(FilterEvent::Stopped);
            }
        }
    }

    /// Signal cancellation and return to `Idle` immediately.
    ///
    /// The worker publishes [`FilterEvent::Stopped`] once it has unwound.
    pub fn stop(&self) {
        let mut slot = lock(&self.shared.slot);
        if matches!(slot.state, JobState::Filtering) {
            log::debug!("{}: stopping job #{}", self.name, slot.generation);
            slot.cancel.cancel();
            slot.state = JobState::Idle;
            drop(slot);
            self.shared.done.notify_all();
        }
    }

    /// Block until the current job leaves `Filtering`.
    pub fn wait(&self) {
        let mut slot = lock(&self.shared.slot);
        while matches!(slot.state, JobState::Filtering) {
            slot = self
                .shared
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn state(&self) -> FilterState {
        match lock(&self.shared.slot).state {
            JobState::Idle => FilterState::Idle,
            JobState::Filtering => FilterState::Filtering,
            JobState::Finished(_) => FilterState::Finished,
        }
    }

    /// Buffered output; empty unless the state is `Finished`.
    pub fn output(&self) -> String {
        match &lock(&self.shared.slot).state {
            JobState::Finished(outcome) => outcome.output.clone(),
            _ => String::new(),
        }
    }

    /// Whether the last finished job changed its text.
    pub fn was_modified(&self) -> bool {
        lock(&self.shared.slot).modified
    }

    /// Forget the modification flag (used when a request is gated out).
    pub fn clear_modified(&self) {
        lock(&self.shared.slot).modified = false;
    }

    /// Drop buffered output: `Finished → Idle`.
    pub fn ack(&self) {
        let mut slot = lock(&self.shared.slot);
        if matches!(slot.state, JobState::Finished(_)) {
            slot.state = JobState::Idle;
        }
    }

    /// Receive a [`FilterEvent`] for every job completion from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FilterEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.shared.listeners).push(tx);
        rx
    }
}

impl Drop for AsyncWorker {
    /// Cancel any in-flight job; the thread is not joined.
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_job<F>(shared: &Shared, generation: u64, cancel: &CancelToken, work: F)
where
    F: FnOnce(&CancelToken) -> Option<JobOutcome>,
{
    let outcome = if cancel.is_cancelled() {
        None
    } else {
        work(cancel)
    };

    let event = {
        let mut slot = lock(&shared.slot);
        let current = slot.generation == generation
            && !cancel.is_cancelled()
            && matches!(slot.state, JobState::Filtering);
        match outcome {
            Some(outcome) if current => {
                slot.modified = outcome.modified;
                slot.state = JobState::Finished(outcome);
                FilterEvent::Finished
            }
            None if current => {
                slot.state = JobState::Idle;
                FilterEvent::Stopped
            }
            _ => FilterEvent::Stopped,
        }
    };

    shared.done.notify_all();
    shared.publish(event);
}
