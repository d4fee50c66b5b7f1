//! # termlink-gen
//!
//! Traffic generators for termlink.
//!
//! This crate provides:
//! - `PayloadSpec`, the validated description of the data to send and how
//!   often
//! - `StopSignal`, used to pace the send loop and end it from listener
//!   callbacks
//! - The `serial-data-generator` and `socket-data-generator` binaries

pub mod error;
pub mod payload;
pub mod signal;

pub use error::GenError;
pub use payload::{PayloadSpec, MAX_RATE_MS, MAX_SIZE};
pub use signal::StopSignal;
