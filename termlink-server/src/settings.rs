//! Server listening settings.

use serde::{Deserialize, Serialize};
use termlink_frame::DataMode;

/// Port, client limit and framing of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    /// Connections beyond this count are closed as soon as they are accepted.
    pub max_clients: u8,
    pub mode: DataMode,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 1234,
            max_clients: 1,
            mode: DataMode::NewLineDelimiter,
        }
    }
}

impl ServerSettings {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn with_max_clients(mut self, max_clients: u8) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn with_mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }
}
