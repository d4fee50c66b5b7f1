//! Connection state machine shared by the serial and socket client drivers.
//!
//! The caller thread requests transitions (`ConnectRequested`,
//! `DisconnectRequested`, `Shutdown`) and the I/O thread reports its own
//! progress (`LoopStarted`, `LoopExited`). Both sides block on the same
//! condition variable.
//!
//! ```text
//!   Idle --ConnectRequested--> Connecting --LoopStarted--> Connected
//!     ^                            |                           |
//!     |                    DisconnectRequested         DisconnectRequested
//!     |                            v                           v
//!     +-------LoopExited------ Disconnecting <-----------------+
//!
//!   any state --Shutdown--> Closing (terminal)
//! ```

use crate::error::CoreError;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// State of a transport link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No connection; the I/O thread is parked.
    Idle,
    /// A connection was established by the caller, waiting for the I/O thread.
    Connecting,
    /// The I/O thread is receiving.
    Connected,
    /// The caller asked the I/O thread to let go of the connection.
    Disconnecting,
    /// The driver is being destroyed; the I/O thread must exit.
    Closing,
}

/// Inputs of the link state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    ConnectRequested,
    LoopStarted,
    DisconnectRequested,
    LoopExited,
    Shutdown,
}

impl LinkState {
    /// Returns the state reached by applying `event`, or `None` if the
    /// transition is not allowed.
    pub fn on(self, event: LinkEvent) -> Option<LinkState> {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (Closing, LoopExited) => Some(Closing),
            (Closing, _) => None,
            (_, Shutdown) => Some(Closing),
            (_, LoopExited) => Some(Idle),
            (Idle, ConnectRequested) => Some(Connecting),
            (Connecting, LoopStarted) => Some(Connected),
            (Connecting | Connected, DisconnectRequested) => Some(Disconnecting),
            _ => None,
        }
    }

    /// True while a connection is being established or is established.
    pub fn is_connected(self) -> bool {
        matches!(self, LinkState::Connecting | LinkState::Connected)
    }
}

/// A `LinkState` guarded by a mutex with change notification.
pub struct LinkControl {
    name: String,
    state: Mutex<LinkState>,
    changed: Condvar,
}

impl LinkControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LinkState::Idle),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Applies `event` and wakes every waiter.
    pub fn apply(&self, event: LinkEvent) -> Result<LinkState, CoreError> {
        let mut state = self.state.lock();
        let from = *state;
        let to = from.on(event).ok_or(CoreError::IllegalTransition {
            state: from,
            event,
        })?;
        *state = to;
        drop(state);

        if from != to {
            tracing::debug!("[{}] link {:?} -> {:?} ({:?})", self.name, from, to, event);
        }
        self.changed.notify_all();
        Ok(to)
    }

    /// Blocks until `pred` holds or `timeout` expires.
    ///
    /// Returns whether `pred` held on return.
    pub fn wait_until<P>(&self, mut pred: P, timeout: Duration) -> bool
    where
        P: FnMut(LinkState) -> bool,
    {
        let mut state = self.state.lock();
        self.changed
            .wait_while_for(&mut state, |s| !pred(*s), timeout);
        pred(*state)
    }

    /// Parks the I/O thread while idle, for at most `timeout`.
    ///
    /// Returns the state observed on wakeup.
    pub fn wait_while_idle(&self, timeout: Duration) -> LinkState {
        let mut state = self.state.lock();
        self.changed
            .wait_while_for(&mut state, |s| *s == LinkState::Idle, timeout);
        *state
    }
}
