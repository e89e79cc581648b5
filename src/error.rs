//! # Error Types
//!
//! Custom error types for Bin Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Bin Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Frame could not be decoded; dropped by the ingest loop, never fatal
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Serial port errors
    #[error("serial port error: {0}")]
    Serial(String),

    /// Durable metadata snapshot could not be parsed or serialized
    #[error("metadata store error: {0}")]
    Store(#[from] serde_json::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// External device automation step failed
    #[error("device command failed: {0}")]
    DeviceCommand(String),

    /// Capture produced no retrievable image file
    #[error("no captured image found in {0}")]
    NoImageFound(String),

    /// Classification submission failed
    #[error("classification call failed: {0}")]
    Classification(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Bin Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
