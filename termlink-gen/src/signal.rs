//! One-shot stop flag with timed waits.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Set once, observed by any number of waiters.
#[derive(Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        *self.stopped.lock() = true;
        self.changed.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.lock()
    }

    /// Waits up to `timeout`; returns true if the signal was triggered.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        self.changed
            .wait_while_for(&mut stopped, |s| !*s, timeout);
        *stopped
    }
}
