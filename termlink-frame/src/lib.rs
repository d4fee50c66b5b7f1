//! # termlink-frame
//!
//! Message framing shared by every termlink transport.
//!
//! This crate provides:
//! - Newline delimiter scanning
//! - 4-byte little-endian length header encoding/decoding
//! - A bounded receive buffer that reassembles frames from partial reads
//! - The `DataMode` both ends of a socket must agree on

pub mod buffer;
pub mod codec;
pub mod error;
pub mod mode;

pub use buffer::ReceiveBuffer;
pub use codec::{
    decode_header, decode_header_frame, encode_frame, encode_header, scan_delimiter,
    validate_declared_length,
};
pub use error::FrameError;
pub use mode::DataMode;

/// Maximum number of bytes a receive buffer holds, and the largest frame
/// that can be written in one call (header included).
pub const MAX_PAYLOAD_LENGTH: usize = 4096;

/// Size of the length prefix used in header mode.
pub const HEADER_SIZE: usize = 4;

/// Byte terminating a frame in delimiter mode.
pub const DELIMITER: u8 = b'\n';
