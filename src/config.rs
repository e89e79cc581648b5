//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        }
    }
}

/// Dashboard-facing HTTP endpoint configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Durable metadata snapshot configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub metadata_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            metadata_path: "data/bins.json".to_string(),
        }
    }
}

/// Capture sequencer configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    /// Local directory captures are pulled into
    pub local_dir: String,
    /// On-device camera output directory
    pub device_photo_dir: String,
    /// adb binary path or name
    pub adb_path: String,
    /// Settle delay between camera stages, milliseconds
    pub settle_ms: u64,
    /// Settle delay before scanning for the pulled capture, milliseconds
    pub transfer_settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            local_dir: "captures".to_string(),
            device_photo_dir: "/sdcard/DCIM/Camera".to_string(),
            adb_path: "adb".to_string(),
            settle_ms: 3000,
            transfer_settle_ms: 2000,
        }
    }
}

/// Classification collaborator configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/trash".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is absent
    ///
    /// A malformed or invalid file is still an error; only a missing file
    /// falls back.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match fs::metadata(&path) {
            Ok(_) => Self::load(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "serial port cannot be empty",
            )));
        }

        if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200",
            )));
        }

        if self.http.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "bind_addr must be a valid socket address (e.g. 0.0.0.0:3001)",
            )));
        }

        if self.store.metadata_path.is_empty() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "metadata_path cannot be empty",
            )));
        }

        if self.capture.local_dir.is_empty() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "capture local_dir cannot be empty",
            )));
        }

        if self.capture.device_photo_dir.is_empty() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "capture device_photo_dir cannot be empty",
            )));
        }

        if self.capture.adb_path.is_empty() {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "capture adb_path cannot be empty",
            )));
        }

        if self.capture.settle_ms > 60_000 {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "settle_ms must be at most 60000",
            )));
        }

        if self.capture.transfer_settle_ms > 60_000 {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "transfer_settle_ms must be at most 60000",
            )));
        }

        if !self.classifier.endpoint.starts_with("http://")
            && !self.classifier.endpoint.starts_with("https://")
        {
            return Err(crate::error::BridgeError::Config(toml::de::Error::custom(
                "classifier endpoint must be an http(s) URL",
            )));
        }

        Ok(())
    }
}
