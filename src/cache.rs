//! # Telemetry Cache
//!
//! Process-lifetime mapping from bin id to the last-known reading.
//!
//! This module handles:
//! - Overwriting the cached reading on every accepted `r` frame
//! - Evicting readings whose bin id has left the metadata snapshot
//! - Merging metadata with cached readings into the dashboard view
//!
//! The cache is an explicitly owned store object (constructed fresh per
//! test), single-writer from the ingest task with concurrent readers on
//! the HTTP path. There is no expiry by age: a stale reading is shown
//! until superseded or its bin id drops out of metadata.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::BinMetadata;

/// Last-known telemetry for one bin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryReading {
    /// Bin id the reading refers to
    pub bin_id: String,
    /// Fill level in percent (0-100)
    pub level: u8,
    /// Lid sensor state carried by the frame, if any
    pub lid_closed: Option<bool>,
    /// When the bridge accepted the reading
    pub observed_at: DateTime<Utc>,
}

/// Read-time combination of durable metadata and cached telemetry
///
/// `level`/`lastUpdated` are omitted from the JSON body when no reading
/// is cached for the bin, so the dashboard can tell "never reported"
/// apart from "empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedBinView {
    pub id: String,
    pub name: String,
    pub height: u32,
    pub width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Outcome of a cache update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Reading stored (bin id present in the metadata snapshot)
    Stored,
    /// Bin id unknown; any prior entry for it was evicted instead
    UnknownBin,
}

/// In-memory cache of the latest reading per bin
#[derive(Debug, Default)]
pub struct TelemetryCache {
    inner: RwLock<HashMap<String, TelemetryReading>>,
}

impl TelemetryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading, or evict if its bin is no longer registered
    ///
    /// `metadata` must be the store snapshot read at update time. A
    /// reading for an id absent from it is never inserted: the bin is
    /// treated as retired and any stale entry is removed, rather than
    /// fabricating telemetry for a bin the dashboard cannot show.
    pub fn update(&self, reading: TelemetryReading, metadata: &[BinMetadata]) -> CacheOutcome {
        let known = metadata.iter().any(|bin| bin.id == reading.bin_id);
        let mut cache = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if known {
            cache.insert(reading.bin_id.clone(), reading);
            CacheOutcome::Stored
        } else {
            cache.remove(&reading.bin_id);
            CacheOutcome::UnknownBin
        }
    }

    /// Latest cached reading for a bin, if any
    pub fn latest(&self, bin_id: &str) -> Option<TelemetryReading> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(bin_id)
            .cloned()
    }

    /// Merge a metadata snapshot with the cached readings
    ///
    /// Output order follows the metadata snapshot. Cache entries whose id
    /// is absent from the snapshot are pruned here, so the merged view can
    /// never resurrect a level for a retired bin.
    pub fn merged_with(&self, metadata: &[BinMetadata]) -> Vec<MergedBinView> {
        let mut cache = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        cache.retain(|id, _| metadata.iter().any(|bin| &bin.id == id));

        metadata
            .iter()
            .map(|bin| {
                let reading = cache.get(&bin.id);
                MergedBinView {
                    id: bin.id.clone(),
                    name: bin.name.clone(),
                    height: bin.height,
                    width: bin.width,
                    level: reading.map(|r| r.level),
                    last_updated: reading.map(|r| r.observed_at),
                }
            })
            .collect()
    }
}
