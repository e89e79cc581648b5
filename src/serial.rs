//! # Serial Communication Module
//!
//! Handles the serial link to the bin-mounted sensor hub.
//!
//! This module handles:
//! - Opening the configured serial port (8N1, default 9600 baud)
//! - Reading newline-delimited telemetry frames
//!
//! The transport gives no delivery guarantee and no replay; the bridge
//! reads whatever lines arrive, in arrival order.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

use crate::config::SerialConfig;
use crate::error::{BridgeError, Result};

/// Line-oriented reader over the sensor serial port
pub struct SensorLink {
    reader: BufReader<tokio_serial::SerialStream>,
    device_path: String,
}

impl std::fmt::Debug for SensorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorLink {
    /// Open the configured sensor port
    ///
    /// # Arguments
    ///
    /// * `config` - Serial port path and baud rate
    ///
    /// # Returns
    ///
    /// * `Result<SensorLink>` - Connected link or error
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened. This is the one fatal
    /// startup condition on the ingest side: the bridge has no purpose
    /// without its transport.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", config.port, e)))?;

        info!("Successfully opened sensor device at {}", config.port);
        Ok(Self {
            reader: BufReader::new(port),
            device_path: config.port.clone(),
        })
    }

    /// Read the next newline-terminated frame
    ///
    /// # Returns
    ///
    /// * `Ok(Some(line))` - One frame, without the trailing newline
    /// * `Ok(None)` - The link reported end of stream
    ///
    /// # Errors
    ///
    /// Returns error on transport read failures; the caller decides
    /// whether to keep reading.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| BridgeError::Serial(format!("read failed: {}", e)))?;

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Consecutive-failure budget for the ingest read loop
///
/// A single bad read is routine line noise, but a transport that fails
/// on every poll (sensor hub unplugged, USB adapter gone) would make a
/// read-driven loop spin hot. The budget counts consecutive failures and
/// reports exhaustion once the limit is hit; any successful read resets
/// it. The caller decides what exhaustion means (the bridge treats it as
/// loss of its one fatal-at-startup resource and shuts down).
#[derive(Debug)]
pub struct ReadErrorBudget {
    consecutive: u32,
    limit: u32,
}

impl ReadErrorBudget {
    /// Create a budget allowing `limit` consecutive failures
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    /// Record one failed read; returns true when the budget is exhausted
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.limit
    }

    /// Record one successful read, resetting the failure streak
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Number of failures in the current streak
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_with_invalid_path_returns_error() {
        let config = SerialConfig {
            port: "/dev/nonexistent_serial_device_12345".to_string(),
            baud_rate: 9600,
        };
        let result = SensorLink::open(&config);

        assert!(result.is_err());
        match result.unwrap_err() {
            BridgeError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    fn test_budget_exhausts_after_limit_consecutive_failures() {
        let mut budget = ReadErrorBudget::new(3);
        assert!(!budget.record_failure());
        assert!(!budget.record_failure());
        assert!(budget.record_failure(), "third consecutive failure exhausts");
        assert_eq!(budget.consecutive_failures(), 3);
    }

    #[test]
    fn test_budget_resets_on_success() {
        let mut budget = ReadErrorBudget::new(2);
        assert!(!budget.record_failure());
        budget.record_success();
        assert_eq!(budget.consecutive_failures(), 0);
        assert!(!budget.record_failure(), "streak restarted from zero");
        assert!(budget.record_failure());
    }

    #[test]
    fn test_limit_of_one_exhausts_on_first_failure() {
        let mut budget = ReadErrorBudget::new(1);
        assert!(budget.record_failure());
        budget.record_success();
        assert!(budget.record_failure());
    }

    // Integration test - only runs if sensor hardware is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_read_frames_from_real_hardware() {
        let config = SerialConfig::default();
        if let Ok(mut link) = SensorLink::open(&config) {
            let line = link.next_line().await;
            println!("First frame from {}: {:?}", link.device_path(), line);
        } else {
            println!("No sensor hardware detected (this is OK for CI/CD)");
        }
    }
}
