//! Framing discipline selection.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a byte stream is split into frames.
///
/// Both ends of a socket must be configured with the same mode; there is no
/// negotiation on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// A frame ends at the first `\n`, which is delivered with the frame.
    #[default]
    NewLineDelimiter,
    /// Each payload is preceded by a 4-byte little-endian length.
    PayloadHeader,
}

impl DataMode {
    pub const ALL: [DataMode; 2] = [DataMode::NewLineDelimiter, DataMode::PayloadHeader];

    /// Returns the canonical upper-case name, as accepted on command lines.
    pub fn name(&self) -> &'static str {
        match self {
            DataMode::NewLineDelimiter => "NEW_LINE_DELIMITER",
            DataMode::PayloadHeader => "PAYLOAD_HEADER",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataMode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEW_LINE_DELIMITER" | "DELIMITER" | "NEWLINE" => Ok(DataMode::NewLineDelimiter),
            "PAYLOAD_HEADER" | "HEADER" => Ok(DataMode::PayloadHeader),
            _ => Err(FrameError::UnknownMode(s.to_string())),
        }
    }
}
