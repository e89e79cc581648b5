//! # Bin Bridge
//!
//! Serial-to-dashboard telemetry bridge for smart bins.
//!
//! Reads `r`/`i` frames from the sensor serial link, keeps the durable
//! metadata snapshot and the in-memory telemetry cache up to date, serves
//! the merged view on `GET /bins`, and fires the capture automation when
//! the bin lid closes after being observed open.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use bin_bridge::api::{self, AppState};
use bin_bridge::cache::TelemetryCache;
use bin_bridge::capture::classify::HttpClassifier;
use bin_bridge::capture::device::AdbAutomation;
use bin_bridge::capture::{CaptureSequencer, CaptureTrigger};
use bin_bridge::config::Config;
use bin_bridge::ingest::Ingestor;
use bin_bridge::serial::{ReadErrorBudget, SensorLink};
use bin_bridge::store::MetadataStore;

/// Configuration file consulted when no path argument is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ingested frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 1000;

/// Consecutive serial read failures tolerated before the transport is
/// considered lost and the process shuts down
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// Pause after a failed serial read, so a flapping transport cannot
/// spin the ingest loop hot while the budget drains
const READ_ERROR_RETRY_MS: u64 = 200;

/// Main entry point for the Bin Bridge application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (defaults if the file is absent)
///    - Open the sensor serial link and bind the dashboard endpoint;
///      either failing aborts the process, everything later is fail-soft
///
/// 2. **Main Loop**
///    - Ingest frames strictly in arrival order
///    - Serve `GET /bins` concurrently on the HTTP task
///    - Run capture sequences asynchronously, one at a time
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid, the serial port cannot
/// be opened, or the HTTP endpoint cannot be bound.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Bin Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    std::fs::create_dir_all(&config.capture.local_dir)
        .with_context(|| format!("creating capture directory {}", config.capture.local_dir))?;
    if let Some(parent) = std::path::Path::new(&config.store.metadata_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }
    }

    let store = Arc::new(MetadataStore::new(&config.store.metadata_path));
    let cache = Arc::new(TelemetryCache::new());

    let sequencer = Arc::new(CaptureSequencer::new(
        Arc::new(AdbAutomation::new(
            config.capture.adb_path.as_str(),
            config.capture.device_photo_dir.as_str(),
        )),
        Arc::new(HttpClassifier::new(config.classifier.endpoint.as_str())),
        &config.capture,
    ));
    let trigger: Arc<dyn CaptureTrigger> = Arc::new(Arc::clone(&sequencer));

    // Fatal startup conditions: serial transport and read endpoint
    let mut link = SensorLink::open(&config.serial).context("opening sensor serial link")?;

    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr)
        .await
        .with_context(|| format!("binding dashboard endpoint {}", config.http.bind_addr))?;
    info!("Dashboard endpoint listening on {}", config.http.bind_addr);

    let router = api::router(AppState {
        store: Arc::clone(&store),
        cache: Arc::clone(&cache),
    });
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!("dashboard endpoint stopped: {}", e);
        }
    });

    info!("Ingesting frames from {}", link.device_path());
    let mut ingestor = Ingestor::new(store, cache, trigger);
    let mut frame_count: u64 = 0;
    let mut read_errors = ReadErrorBudget::new(MAX_CONSECUTIVE_READ_ERRORS);

    // Main ingest loop: one frame fully applied before the next is read
    loop {
        tokio::select! {
            line = link.next_line() => match line {
                Ok(Some(line)) => {
                    read_errors.record_success();
                    ingestor.handle_line(&line);
                    frame_count += 1;
                    if frame_count % LOG_INTERVAL_FRAMES == 0 {
                        info!("Ingested {} frames", frame_count);
                    }
                }
                Ok(None) => {
                    warn!("sensor link closed by transport");
                    break;
                }
                Err(e) => {
                    warn!("serial read error: {}", e);
                    if read_errors.record_failure() {
                        // The bridge has no purpose without its transport;
                        // a dead link is as fatal as failing to open it
                        anyhow::bail!(
                            "sensor link lost after {} consecutive read errors",
                            read_errors.consecutive_failures()
                        );
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(READ_ERROR_RETRY_MS)).await;
                }
            },

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total frames ingested: {}", frame_count);
    Ok(())
}
