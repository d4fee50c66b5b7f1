//! Client connection settings.

use serde::{Deserialize, Serialize};
use termlink_frame::DataMode;

/// Where a client connects and how it frames data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Dotted-quad IPv4 address of the server.
    pub address: String,
    pub port: u16,
    pub mode: DataMode,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 1234,
            mode: DataMode::NewLineDelimiter,
        }
    }
}

impl ClientSettings {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }
}
