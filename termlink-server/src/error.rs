//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("already listening")]
    AlreadyListening,

    #[error("invalid port: {0}")]
    InvalidPort(u16),

    #[error("max clients must be at least 1")]
    InvalidMaxClients,

    #[error("cannot listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("no client accepted the data")]
    NoClientAccepted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] termlink_frame::FrameError),

    #[error("send stalled after {written} of {total} bytes")]
    WriteStalled { written: usize, total: usize },

    #[error(transparent)]
    Core(#[from] termlink_core::CoreError),
}

impl ServerError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::Bind { .. } => true,
            ServerError::NoClientAccepted => true,
            ServerError::Io(_) => true,
            ServerError::WriteStalled { .. } => true,
            ServerError::Core(e) => e.is_retryable(),
            _ => false,
        }
    }
}
