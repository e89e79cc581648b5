//! # Metadata Store Accessor
//!
//! Owns the durable bin metadata snapshot (`bins.json`).
//!
//! This module handles:
//! - Reading the ordered bin metadata snapshot
//! - In-place dimension upserts from `i` frames
//! - Atomic whole-file rewrites (write-temp-then-rename) so readers never
//!   observe a partially written snapshot
//!
//! Bin creation and deletion are administrative operations outside this
//! bridge; telemetry traffic never inserts new bins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Durable description of one bin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinMetadata {
    /// Unique bin id, the key every frame correlates on
    pub id: String,
    /// Human-readable name shown on the dashboard
    pub name: String,
    /// Bin height in centimeters
    pub height: u32,
    /// Bin width in centimeters
    pub width: u32,
}

/// Outcome of a dimension upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record existed and its dimensions were overwritten
    Updated,
    /// No record with that id; the snapshot is untouched
    UnknownBin,
}

/// Accessor for the durable bin metadata file
///
/// Reads always hit the file (the dashboard must see administrative edits
/// made by other processes); only telemetry is cached, never metadata.
/// A mutex serialises each read-modify-write upsert; metadata frames are
/// rare enough that this simple exclusion region suffices.
pub struct MetadataStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl MetadataStore {
    /// Create an accessor for the snapshot at `path`
    ///
    /// The file does not have to exist yet; a missing file reads as an
    /// empty store until the administrative side creates it.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the durable snapshot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current ordered metadata snapshot
    ///
    /// # Returns
    ///
    /// * `Result<Vec<BinMetadata>>` - Records in file order
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn get(&self) -> Result<Vec<BinMetadata>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let bins: Vec<BinMetadata> = serde_json::from_str(&contents)?;
        Ok(bins)
    }

    /// Overwrite the dimensions of an existing bin
    ///
    /// Locates the record by id and rewrites the full snapshot with height
    /// and width replaced; name and id are untouched. An unknown id is a
    /// no-op that reports `UnknownBin`; sensors keep broadcasting ids the
    /// administrator has not registered yet, and that must stay harmless.
    ///
    /// # Arguments
    ///
    /// * `id` - Bin id from the metadata frame
    /// * `height` - New height in centimeters
    /// * `width` - New width in centimeters
    ///
    /// # Errors
    ///
    /// Returns error if the snapshot cannot be read or rewritten.
    pub fn upsert_dimensions(&self, id: &str, height: u32, width: u32) -> Result<UpsertOutcome> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut bins = self.get()?;
        let Some(bin) = bins.iter_mut().find(|bin| bin.id == id) else {
            return Ok(UpsertOutcome::UnknownBin);
        };

        bin.height = height;
        bin.width = width;
        self.write_snapshot(&bins)?;
        Ok(UpsertOutcome::Updated)
    }

    /// Rewrite the full snapshot atomically from a reader's perspective
    ///
    /// Serializes to a sibling temp file and renames it over the target;
    /// rename within one directory is atomic on the platforms we run on.
    fn write_snapshot(&self, bins: &[BinMetadata]) -> Result<()> {
        let json = serde_json::to_string_pretty(bins)?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
