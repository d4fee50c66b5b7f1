//! Client error types.

use std::net::SocketAddrV4;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] termlink_frame::FrameError),

    #[error("send stalled after {written} of {total} bytes")]
    WriteStalled { written: usize, total: usize },

    #[error("receive thread did not acknowledge within {timeout_ms}ms")]
    StateTimeout { timeout_ms: u64 },

    #[error(transparent)]
    Core(#[from] termlink_core::CoreError),
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connect { .. } => true,
            ClientError::Io(_) => true,
            ClientError::WriteStalled { .. } => true,
            ClientError::StateTimeout { .. } => true,
            ClientError::Core(e) => e.is_retryable(),
            _ => false,
        }
    }
}
