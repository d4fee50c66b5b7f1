//! Serial transport error types.

use thiserror::Error;

/// Serial transport errors.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("port already opened")]
    AlreadyOpened,

    #[error("port not opened")]
    NotOpened,

    #[error("cannot open {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot configure port: {0}")]
    Attributes(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("write stalled after {written} of {total} bytes")]
    WriteStalled { written: usize, total: usize },

    #[error("receive thread did not acknowledge within {timeout_ms}ms")]
    StateTimeout { timeout_ms: u64 },

    #[error("unknown {kind}: {value}")]
    UnknownSetting { kind: &'static str, value: String },

    #[error(transparent)]
    Core(#[from] termlink_core::CoreError),
}

impl SerialError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SerialError::Open { .. } => true,
            SerialError::Write(_) => true,
            SerialError::WriteStalled { .. } => true,
            SerialError::StateTimeout { .. } => true,
            SerialError::Core(e) => e.is_retryable(),
            _ => false,
        }
    }
}
