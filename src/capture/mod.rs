//! # Capture Sequencer Module
//!
//! Fixed-sequence device automation fired on a lid close-after-open edge.
//!
//! This module handles:
//! - The strictly ordered, timed capture workflow (wake, unlock, clear,
//!   shoot, pull, screen off)
//! - Fail-soft execution: a failing step is logged and the sequence moves
//!   on, except that "no image retrieved" gates the classification call
//! - The at-most-one-concurrent-capture invariant via a single-slot
//!   in-flight flag (a transition during an active run is dropped)
//! - Forwarding the selected capture filename to the classification
//!   collaborator

pub mod classify;
pub mod device;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::{BridgeError, Result};
use classify::ClassificationSink;
use device::DeviceAutomation;

/// Entry point the ingest pipeline fires transitions through
///
/// Narrow on purpose: ingest only ever needs "request a capture for this
/// bin id", and tests swap in a recording stub.
pub trait CaptureTrigger: Send + Sync {
    /// Request a capture correlated to `bin_id`; returns false if the
    /// request was dropped because a sequence is already in flight
    fn fire(&self, bin_id: &str) -> bool;
}

/// Filename extensions accepted as capture output
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Executes the capture workflow against the controlled device
pub struct CaptureSequencer {
    device: Arc<dyn DeviceAutomation>,
    classifier: Arc<dyn ClassificationSink>,
    local_dir: PathBuf,
    settle: Duration,
    transfer_settle: Duration,
    in_flight: AtomicBool,
}

impl CaptureSequencer {
    /// Create a sequencer
    ///
    /// # Arguments
    ///
    /// * `device` - Automation boundary to the controlled device
    /// * `classifier` - Downstream sink for the selected capture filename
    /// * `config` - Local capture directory and settle delays
    pub fn new(
        device: Arc<dyn DeviceAutomation>,
        classifier: Arc<dyn ClassificationSink>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            device,
            classifier,
            local_dir: PathBuf::from(&config.local_dir),
            settle: Duration::from_millis(config.settle_ms),
            transfer_settle: Duration::from_millis(config.transfer_settle_ms),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claim the single in-flight slot; false if a run is already active
    fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the in-flight slot
    fn finish(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    /// Spawn one capture run, unless one is already in flight
    ///
    /// Returns immediately so frame ingestion is never blocked behind the
    /// multi-second sequence. The flag, not a held mutex, enforces the
    /// one-at-a-time invariant, so unrelated state reads keep flowing.
    pub fn trigger(self: Arc<Self>, bin_id: &str) -> bool {
        if !self.try_begin() {
            warn!(bin = bin_id, "capture already in flight, transition dropped");
            return false;
        }

        let sequencer = self;
        let bin_id = bin_id.to_string();
        tokio::spawn(async move {
            sequencer.run_sequence(&bin_id).await;
            sequencer.finish();
        });
        true
    }

    /// Execute the ordered workflow once
    ///
    /// Every external step is independently fail-soft: a failure is
    /// logged and the next step still runs. Only a missing capture file
    /// aborts the tail of the workflow (no image, no classification).
    pub async fn run_sequence(&self, bin_id: &str) {
        info!(bin = bin_id, "starting capture sequence");

        // 1. Wake the display if it is off
        match self.device.display_is_on().await {
            Ok(true) => debug!("display already on"),
            Ok(false) => self.fail_soft("wake", self.device.wake().await),
            Err(e) => warn!("display state query failed: {}", e),
        }

        // 2. Dismiss the lock screen if it is showing
        match self.device.is_locked().await {
            Ok(false) => debug!("device already unlocked"),
            Ok(true) => self.fail_soft("unlock", self.device.unlock().await),
            Err(e) => warn!("lock state query failed: {}", e),
        }

        // 3. Best-effort clear of stale photos on the device
        self.fail_soft("clear photo dir", self.device.clear_photo_dir().await);

        // 4. Camera stages, each bounded by a fixed settle delay for UI
        //    animation latency on the controlled device
        sleep(self.settle).await;
        self.fail_soft("launch camera", self.device.launch_camera().await);
        sleep(self.settle).await;
        self.fail_soft("trigger shutter", self.device.trigger_shutter().await);
        sleep(self.settle).await;

        // 5. Pull captures to local storage
        self.fail_soft("pull photos", self.device.pull_photos(&self.local_dir).await);

        // 6. Screen back off
        self.fail_soft("screen off", self.device.screen_off().await);

        // 7-8. Let the transfer land, then pick the newest capture; a
        //      missing image aborts the tail of the workflow
        sleep(self.transfer_settle).await;
        let filename = match newest_capture(&self.local_dir).await {
            Ok(filename) => filename,
            Err(e @ BridgeError::NoImageFound(_)) => {
                warn!(bin = bin_id, "{}, skipping classification", e);
                return;
            }
            Err(e) => {
                warn!(bin = bin_id, "capture directory scan failed: {}", e);
                return;
            }
        };

        // 9. Forward to the classification collaborator; a failed call is
        //    dropped along with the correlation id (no retry)
        info!(bin = bin_id, file = %filename, "submitting capture for classification");
        if let Err(e) = self.classifier.submit(&filename).await {
            warn!(bin = bin_id, "classification submission failed: {}", e);
        }
    }

    fn fail_soft(&self, step: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!("capture step '{}' failed, continuing: {}", step, e);
        }
    }
}

impl CaptureTrigger for Arc<CaptureSequencer> {
    fn fire(&self, bin_id: &str) -> bool {
        Arc::clone(self).trigger(bin_id)
    }
}

/// Select the newest capture in `dir` by lexicographically greatest
/// image filename
///
/// Capture filenames are expected to sort by capture order (timestamp
/// names); this is a heuristic, not a guarantee.
///
/// # Errors
///
/// Returns `BridgeError::NoImageFound` if the directory holds no file
/// with an image extension, or an I/O error if it cannot be scanned.
async fn newest_capture(dir: &Path) -> Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<String> = None;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_image = Path::new(&name)
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);

        if is_image && newest.as_deref().map_or(true, |current| name.as_str() > current) {
            newest = Some(name);
        }
    }
    newest.ok_or_else(|| BridgeError::NoImageFound(dir.display().to_string()))
}
