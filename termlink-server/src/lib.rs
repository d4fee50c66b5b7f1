//! # termlink-server
//!
//! TCP server transport for termlink.
//!
//! This crate provides:
//! - `SocketServer`, which accepts up to a configured number of clients
//!   and runs one receive thread per client
//! - A dispatch queue, so listener callbacks all run on a single thread
//! - Broadcast writes to every connected client
//! - The `ServerIo` capability and its `std::net` implementation

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod io;
pub mod server;
pub mod settings;

pub use dispatch::{EventQueue, EventRecord};
pub use error::ServerError;
pub use handler::{ClientHandler, ClientId};
pub use io::{ServerIo, TcpServerIo};
pub use server::{ServerEvent, ServerListener, SocketServer};
pub use settings::ServerSettings;
