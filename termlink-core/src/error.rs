//! Core error types.

use crate::link::{LinkEvent, LinkState};
use thiserror::Error;

/// Errors from workers and the link state machine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to spawn thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread '{name}' did not start within {timeout_ms}ms")]
    StartTimeout { name: String, timeout_ms: u64 },

    #[error("illegal link transition: {event:?} in state {state:?}")]
    IllegalTransition { state: LinkState, event: LinkEvent },
}

impl CoreError {
    /// Returns whether this error indicates the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Spawn { .. } | CoreError::StartTimeout { .. })
    }
}
