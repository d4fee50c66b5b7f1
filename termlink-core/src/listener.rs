//! Non-owning listener registries.

use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::sync::{Arc, Weak};

struct Slot<L: ?Sized> {
    listener: Weak<L>,
    // Held for the duration of a callback. Reentrant so a listener can
    // remove itself from inside its own callback.
    active: ReentrantMutex<Cell<bool>>,
}

/// Thread-safe list of listeners notified by a transport.
///
/// Listeners are held weakly: registering does not keep a listener alive,
/// and dropped listeners are skipped and pruned. Once `remove` returns, the
/// removed listener is never called again.
pub struct Listeners<L: ?Sized> {
    slots: Mutex<Vec<Arc<Slot<L>>>>,
}

impl<L: ?Sized> Listeners<L> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener. Registering the same listener twice is a no-op.
    pub fn add(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        let mut slots = self.slots.lock();
        if slots.iter().any(|s| Weak::ptr_eq(&s.listener, &weak)) {
            return;
        }
        slots.push(Arc::new(Slot {
            listener: weak,
            active: ReentrantMutex::new(Cell::new(true)),
        }));
    }

    /// Unregisters a listener, waiting for any in-flight callback to it on
    /// another thread to finish.
    ///
    /// Returns false if the listener was not registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let weak = Arc::downgrade(listener);
        let slot = {
            let mut slots = self.slots.lock();
            match slots.iter().position(|s| Weak::ptr_eq(&s.listener, &weak)) {
                Some(idx) => slots.remove(idx),
                None => return false,
            }
        };
        slot.active.lock().set(false);
        true
    }

    /// Calls `f` for every live listener, in registration order.
    ///
    /// The registry lock is not held while `f` runs.
    pub fn notify<F>(&self, mut f: F)
    where
        F: FnMut(&L),
    {
        let snapshot: Vec<Arc<Slot<L>>> = self.slots.lock().clone();
        let mut saw_dead = false;

        for slot in &snapshot {
            let guard = slot.active.lock();
            if !guard.get() {
                continue;
            }
            match slot.listener.upgrade() {
                Some(listener) => f(&listener),
                None => saw_dead = true,
            }
        }

        if saw_dead {
            self.slots.lock().retain(|s| s.listener.strong_count() > 0);
        }
    }

    /// Number of registered listeners that are still alive.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| s.listener.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}
