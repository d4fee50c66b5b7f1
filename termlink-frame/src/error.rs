//! Framing error types.

use thiserror::Error;

/// Errors raised while encoding or validating frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("declared payload length {declared} exceeds maximum {max}")]
    DeclaredLengthTooLarge { declared: u32, max: usize },

    #[error("unknown data mode: {0}")]
    UnknownMode(String),
}
