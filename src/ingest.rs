//! # Ingest Pipeline
//!
//! Per-frame dispatch from the serial link into bridge state.
//!
//! This module handles:
//! - Decoding each arriving line and dropping malformed frames
//! - Routing reading frames into the telemetry cache and lid monitor
//! - Routing metadata frames into the durable store
//! - Firing the capture trigger on a lid close-after-open edge
//!
//! Frames are processed strictly in arrival order; one frame's cache,
//! store, and lid updates complete before the next line is handled. The
//! capture trigger only spawns work, so a slow sequence never stalls
//! ingestion.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{CacheOutcome, TelemetryCache, TelemetryReading};
use crate::capture::CaptureTrigger;
use crate::frame::{self, Frame, MetadataFrame, ReadingFrame};
use crate::lid::LidMonitor;
use crate::store::{MetadataStore, UpsertOutcome};

/// Single-writer frame processor
///
/// Owns the lid monitor outright; the store and cache are shared with
/// the read path, which only ever observes state between frames.
pub struct Ingestor {
    store: Arc<MetadataStore>,
    cache: Arc<TelemetryCache>,
    lid: LidMonitor,
    trigger: Arc<dyn CaptureTrigger>,
}

impl Ingestor {
    /// Create a pipeline over the shared store and cache
    pub fn new(
        store: Arc<MetadataStore>,
        cache: Arc<TelemetryCache>,
        trigger: Arc<dyn CaptureTrigger>,
    ) -> Self {
        Self {
            store,
            cache,
            lid: LidMonitor::new(),
            trigger,
        }
    }

    /// Process one line of serial input
    ///
    /// Every failure mode here is fail-soft: the transport offers no
    /// replay, so a frame that cannot be applied is logged and dropped.
    pub fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        debug!(raw = line, "received frame");

        match frame::decode_line(line) {
            Ok(Frame::Reading(reading)) => self.apply_reading(reading),
            Ok(Frame::Metadata(update)) => self.apply_metadata(update),
            Err(e) => warn!("dropping frame: {}", e),
        }
    }

    fn apply_reading(&mut self, reading: ReadingFrame) {
        let metadata = match self.store.get() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("metadata snapshot unreadable, dropping reading: {}", e);
                return;
            }
        };

        let bin_id = reading.bin_id.clone();
        let outcome = self.cache.update(
            TelemetryReading {
                bin_id: reading.bin_id,
                level: reading.level,
                lid_closed: reading.lid_closed,
                observed_at: Utc::now(),
            },
            &metadata,
        );
        if outcome == CacheOutcome::UnknownBin {
            warn!(bin = %bin_id, "reading for unregistered bin, cache entry evicted");
        }

        // Lid edge detection runs for every accepted reading that carries
        // a lid value, registered bin or not; the triggering frame's id is
        // passed through for downstream tagging either way.
        let Some(lid_closed) = reading.lid_closed else {
            return;
        };
        if self.lid.observe(lid_closed) {
            if outcome == CacheOutcome::UnknownBin {
                warn!(bin = %bin_id, "lid transition for bin with no metadata record");
            }
            self.trigger.fire(&bin_id);
        }
    }

    fn apply_metadata(&mut self, update: MetadataFrame) {
        match self
            .store
            .upsert_dimensions(&update.bin_id, update.height, update.width)
        {
            Ok(UpsertOutcome::Updated) => {
                debug!(bin = %update.bin_id, height = update.height, width = update.width,
                    "bin dimensions updated");
            }
            Ok(UpsertOutcome::UnknownBin) => {
                warn!(bin = %update.bin_id, "unidentified bin, metadata frame ignored");
            }
            Err(e) => warn!(bin = %update.bin_id, "metadata upsert failed: {}", e),
        }
    }
}
