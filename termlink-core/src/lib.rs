//! # termlink-core
//!
//! Runtime pieces shared by the termlink transports.
//!
//! This crate provides:
//! - `Worker`, a named OS thread with a bounded start handshake
//! - `Listeners`, non-owning callback registries safe against concurrent removal
//! - The link state machine driving serial and socket client I/O threads
//! - The socket receive loop for both framing modes
//! - Throughput measurement and timeout configuration

pub mod config;
pub mod error;
pub mod link;
pub mod listener;
pub mod receive;
pub mod throughput;
pub mod worker;

pub use config::TimeoutConfig;
pub use error::CoreError;
pub use link::{LinkControl, LinkEvent, LinkState};
pub use listener::Listeners;
pub use receive::{is_timeout, receive_frames, LoopExit};
pub use throughput::{ByteUnit, Throughput, ThroughputCalculator};
pub use worker::{Worker, WorkerContext, WorkerState};
