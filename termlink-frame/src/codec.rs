//! Encoding and decoding of framed payloads.
//!
//! Two wire disciplines are supported:
//!
//! ```text
//! delimiter mode:  <payload bytes>\n
//!
//! header mode:     +--------+--------+--------+--------+----------------+
//!                  | len[0] | len[1] | len[2] | len[3] | payload (len)  |
//!                  +--------+--------+--------+--------+----------------+
//!                    unsigned 32-bit little-endian
//! ```

use crate::error::FrameError;
use crate::mode::DataMode;
use crate::{DELIMITER, HEADER_SIZE, MAX_PAYLOAD_LENGTH};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Returns the index of the first delimiter byte in `buf`, if any.
pub fn scan_delimiter(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == DELIMITER)
}

/// Encodes a payload length as a 4-byte little-endian header.
pub fn encode_header(len: u32) -> [u8; HEADER_SIZE] {
    len.to_le_bytes()
}

/// Decodes a 4-byte little-endian header.
pub fn decode_header(header: [u8; HEADER_SIZE]) -> u32 {
    u32::from_le_bytes(header)
}

/// Checks that a decoded header announces a payload that fits a receive buffer.
pub fn validate_declared_length(declared: u32) -> Result<usize, FrameError> {
    let len = declared as usize;
    if len > MAX_PAYLOAD_LENGTH {
        return Err(FrameError::DeclaredLengthTooLarge {
            declared,
            max: MAX_PAYLOAD_LENGTH,
        });
    }
    Ok(len)
}

/// Builds the bytes a writer puts on the wire for `payload`.
///
/// In delimiter mode the payload is sent verbatim; the caller owns the
/// terminating `\n`. In header mode a length prefix is prepended. Either way
/// the whole frame must fit in `MAX_PAYLOAD_LENGTH` bytes.
pub fn encode_frame(mode: DataMode, payload: &[u8]) -> Result<BytesMut, FrameError> {
    let total = match mode {
        DataMode::NewLineDelimiter => payload.len(),
        DataMode::PayloadHeader => HEADER_SIZE + payload.len(),
    };
    if total > MAX_PAYLOAD_LENGTH {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: MAX_PAYLOAD_LENGTH,
        });
    }

    let mut buf = BytesMut::with_capacity(total);
    if mode == DataMode::PayloadHeader {
        buf.put_u32_le(payload.len() as u32);
    }
    buf.put_slice(payload);
    Ok(buf)
}

/// Decodes one header-mode frame from the front of `buf`.
///
/// Returns `Ok(Some(payload))` if a complete frame was consumed, `Ok(None)`
/// if more data is needed, or `Err` if the header announces an oversized
/// payload.
pub fn decode_header_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let declared = decode_header([buf[0], buf[1], buf[2], buf[3]]);
    let len = validate_declared_length(declared)?;
    if buf.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    buf.advance(HEADER_SIZE);
    Ok(Some(buf.split_to(len).freeze()))
}
