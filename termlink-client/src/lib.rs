//! # termlink-client
//!
//! TCP client transport for termlink.
//!
//! This crate provides:
//! - `SocketClient`, which connects to an IPv4 server and delivers framed
//!   data to listeners from a background thread
//! - The `SocketIo` capability and its `std::net` implementation
//! - Client settings

pub mod client;
pub mod error;
pub mod io;
pub mod settings;

pub use client::{ClientEvent, ClientListener, SocketClient};
pub use error::ClientError;
pub use io::{SocketIo, TcpIo};
pub use settings::ClientSettings;
