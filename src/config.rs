//! Terminal configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via TERMLINK_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use termlink_client::ClientSettings;
use termlink_core::TimeoutConfig;
use termlink_server::ServerSettings;
use termlink_serial::SerialSettings;

/// Which transport the terminal drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Serial,
    Client,
    Server,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Serial => "serial",
            TransportKind::Client => "client",
            TransportKind::Server => "server",
        })
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(TransportKind::Serial),
            "client" | "socket_client" => Ok(TransportKind::Client),
            "server" | "socket_server" => Ok(TransportKind::Server),
            _ => Err(ConfigError::ValidationError(format!(
                "unknown transport '{}'",
                s
            ))),
        }
    }
}

/// Terminal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportKind,
    pub serial: SerialSettings,
    pub client: ClientSettings,
    pub server: ServerSettings,
    pub timeouts: TimeoutConfig,
    /// Seconds between throughput log lines; 0 disables them.
    pub throughput_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            serial: SerialSettings::default(),
            client: ClientSettings::default(),
            server: ServerSettings::default(),
            timeouts: TimeoutConfig::default(),
            throughput_interval_secs: 5,
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or TERMLINK_CONFIG), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("TERMLINK_CONFIG").ok().map(PathBuf::from));
        if let Some(path) = path {
            config = Self::from_file(&path)?;
            tracing::info!("Loaded config from {}", path.display());
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides looked up by variable name. Unparsable values are
    /// ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(transport) = var("TERMLINK_TRANSPORT").and_then(|v| v.parse().ok()) {
            self.transport = transport;
        }

        if let Some(device) = var("TERMLINK_DEVICE") {
            self.serial.device = device;
        }

        if let Some(baud) = var("TERMLINK_BAUD").and_then(|v| v.parse().ok()) {
            self.serial.baud_rate = baud;
        }

        if let Some(address) = var("TERMLINK_ADDRESS") {
            self.client.address = address;
        }

        if let Some(port) = var("TERMLINK_PORT").and_then(|v| v.parse().ok()) {
            self.client.port = port;
            self.server.port = port;
        }

        if let Some(max) = var("TERMLINK_MAX_CLIENTS").and_then(|v| v.parse().ok()) {
            self.server.max_clients = max;
        }

        if let Some(mode) = var("TERMLINK_DATA_MODE").and_then(|v| v.parse().ok()) {
            self.client.mode = mode;
            self.server.mode = mode;
        }
    }

    /// Checks the settings of the selected transport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.transport {
            TransportKind::Serial => {
                if self.serial.device.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "serial.device must not be empty".to_string(),
                    ));
                }
            }
            TransportKind::Client => {
                if self.client.address.parse::<Ipv4Addr>().is_err() {
                    return Err(ConfigError::ValidationError(format!(
                        "client.address '{}' is not an IPv4 address",
                        self.client.address
                    )));
                }
                if self.client.port == 0 {
                    return Err(ConfigError::ValidationError(
                        "client.port must not be 0".to_string(),
                    ));
                }
            }
            TransportKind::Server => {
                if self.server.port == 0 {
                    return Err(ConfigError::ValidationError(
                        "server.port must not be 0".to_string(),
                    ));
                }
                if self.server.max_clients == 0 {
                    return Err(ConfigError::ValidationError(
                        "server.max_clients must be at least 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn throughput_interval(&self) -> Option<Duration> {
        (self.throughput_interval_secs > 0)
            .then(|| Duration::from_secs(self.throughput_interval_secs))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
