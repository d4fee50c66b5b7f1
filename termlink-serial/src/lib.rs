//! # termlink-serial
//!
//! Serial port transport for termlink.
//!
//! This crate provides:
//! - Port settings (baud rate, data bits, parity, stop bits) with their
//!   canonical names
//! - The `SerialIo` capability and its termios implementation
//! - `SerialDriver`, which receives newline-delimited frames on a background
//!   thread and reports them to listeners

pub mod driver;
pub mod error;
pub mod io;
pub mod settings;

pub use driver::{SerialDriver, SerialEvent, SerialListener};
pub use error::SerialError;
pub use io::{PortAttributes, SerialIo, TermiosIo};
pub use settings::{BaudRate, DataBits, ParityType, SerialSettings, StopBits};
