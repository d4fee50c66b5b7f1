//! Timing configuration shared by all transports.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts used by transports when handshaking with their threads and
/// polling their sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long `start` waits for a worker thread to signal it is running.
    pub thread_start_ms: u64,
    /// How long a caller waits for the I/O thread to acknowledge a
    /// connect or disconnect.
    pub state_change_ms: u64,
    /// Socket and serial receive timeout.
    pub receive_ms: u64,
    /// Sleep between non-blocking accept attempts.
    pub accept_poll_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            thread_start_ms: 1000,
            state_change_ms: 500,
            receive_ms: 500,
            accept_poll_ms: 20,
        }
    }
}

impl TimeoutConfig {
    pub fn with_thread_start(mut self, timeout: Duration) -> Self {
        self.thread_start_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_state_change(mut self, timeout: Duration) -> Self {
        self.state_change_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_receive(mut self, timeout: Duration) -> Self {
        self.receive_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_accept_poll(mut self, interval: Duration) -> Self {
        self.accept_poll_ms = interval.as_millis() as u64;
        self
    }

    pub fn thread_start(&self) -> Duration {
        Duration::from_millis(self.thread_start_ms)
    }

    pub fn state_change(&self) -> Duration {
        Duration::from_millis(self.state_change_ms)
    }

    /// Receive timeout; never zero, since a zero socket timeout means
    /// "block forever".
    pub fn receive(&self) -> Duration {
        Duration::from_millis(self.receive_ms.max(1))
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms.max(1))
    }
}
