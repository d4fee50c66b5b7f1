//! Named background threads with a bounded start handshake.

use crate::error::CoreError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Shared {
    state: Mutex<WorkerState>,
    changed: Condvar,
}

impl Shared {
    fn set(&self, state: WorkerState) {
        *self.state.lock() = state;
        self.changed.notify_all();
    }
}

/// Handle given to the work function.
///
/// The work function is expected to return promptly once `is_running`
/// turns false.
pub struct WorkerContext {
    shared: Arc<Shared>,
}

impl WorkerContext {
    /// Returns true until a stop has been requested.
    pub fn is_running(&self) -> bool {
        *self.shared.state.lock() == WorkerState::Running
    }

    /// Sleeps for up to `timeout`, waking early if a stop is requested.
    ///
    /// Returns whether the worker is still running.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        self.shared
            .changed
            .wait_while_for(&mut state, |s| *s == WorkerState::Running, timeout);
        *state == WorkerState::Running
    }
}

type WorkFn = dyn Fn(&WorkerContext) + Send + Sync;

/// A restartable OS thread running a work function.
///
/// `start` does not return until the thread has actually begun running (or
/// the timeout expires), so callers can rely on the thread being live.
///
/// ```
/// use std::time::Duration;
/// use termlink_core::Worker;
///
/// let worker = Worker::new("ticker", |ctx| {
///     while ctx.sleep(Duration::from_millis(10)) {}
/// });
/// worker.start(Duration::from_secs(1)).unwrap();
/// assert!(worker.is_running());
/// worker.stop();
/// assert!(!worker.is_running());
/// ```
pub struct Worker {
    name: String,
    work: Arc<WorkFn>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Fn(&WorkerContext) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            work: Arc::new(work),
            shared: Arc::new(Shared {
                state: Mutex::new(WorkerState::Stopped),
                changed: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Spawns the thread and waits up to `timeout` for it to run.
    ///
    /// Starting a running worker is a no-op. On timeout the thread is asked
    /// to stop and joined, leaving the worker stopped.
    pub fn start(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut handle = self.handle.lock();

        if self.is_running() {
            return Ok(());
        }
        // A previous thread whose work function returned on its own.
        if let Some(finished) = handle.take() {
            let _ = finished.join();
        }

        self.shared.set(WorkerState::Starting);

        let shared = self.shared.clone();
        let work = self.work.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run(shared, work));

        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                self.shared.set(WorkerState::Stopped);
                return Err(CoreError::Spawn {
                    name: self.name.clone(),
                    source: e,
                });
            }
        };

        let mut state = self.shared.state.lock();
        self.shared
            .changed
            .wait_while_for(&mut state, |s| *s == WorkerState::Starting, timeout);

        if *state == WorkerState::Starting {
            *state = WorkerState::Stopping;
            drop(state);
            self.shared.changed.notify_all();
            let _ = join.join();
            self.shared.set(WorkerState::Stopped);
            tracing::warn!("[{}] thread did not start in time", self.name);
            return Err(CoreError::StartTimeout {
                name: self.name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        drop(state);

        *handle = Some(join);
        tracing::debug!("[{}] thread started", self.name);
        Ok(())
    }

    /// Requests the thread to stop and joins it. Idempotent.
    pub fn stop(&self) {
        let mut handle = self.handle.lock();
        let Some(join) = handle.take() else {
            return;
        };

        {
            let mut state = self.shared.state.lock();
            if matches!(*state, WorkerState::Running | WorkerState::Starting) {
                *state = WorkerState::Stopping;
            }
        }
        self.shared.changed.notify_all();

        if join.thread().id() == thread::current().id() {
            // Stopping from inside the work function: the thread exits on its
            // own once the work function returns; a later start or stop joins it.
            tracing::debug!("[{}] stop requested from own thread", self.name);
            *handle = Some(join);
            return;
        }

        if join.join().is_err() {
            tracing::error!("[{}] thread panicked", self.name);
        }
        self.shared.set(WorkerState::Stopped);
        tracing::debug!("[{}] thread stopped", self.name);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<Shared>, work: Arc<WorkFn>) {
    let proceed = {
        let mut state = shared.state.lock();
        if *state == WorkerState::Starting {
            *state = WorkerState::Running;
            true
        } else {
            false
        }
    };
    shared.changed.notify_all();

    if proceed {
        let ctx = WorkerContext {
            shared: shared.clone(),
        };
        work(&ctx);
    }

    shared.set(WorkerState::Stopped);
}
