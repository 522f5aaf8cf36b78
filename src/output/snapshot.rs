//! JSON snapshot output
//!
//! The snapshot is the only persisted artifact of a run:
//!
//! ```json
//! {
//!   "last_updated": "2024-05-01 14:03:09",
//!   "total_count": 2,
//!   "entities": {
//!     "0a1b-2c3d": "Aoi Sora",
//!     "4e5f-6a7b": "三上悠亜"
//!   }
//! }
//! ```

use crate::model::EntityMap;
use crate::output::{OutputError, OutputResult, SnapshotSink};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Final merged result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated: String,
    pub total_count: usize,
    pub entities: EntityMap,
}

impl Snapshot {
    pub fn new(entities: EntityMap, last_updated: DateTime<FixedOffset>) -> Self {
        Self {
            last_updated: last_updated.format(TIMESTAMP_FORMAT).to_string(),
            total_count: entities.len(),
            entities,
        }
    }

    /// Builds a snapshot stamped with the current time at the given UTC offset
    ///
    /// # Errors
    ///
    /// Returns `OutputError::InvalidOffset` if the offset is out of range.
    pub fn stamped(entities: EntityMap, utc_offset_hours: i32) -> OutputResult<Self> {
        let offset = utc_offset(utc_offset_hours)?;
        Ok(Self::new(entities, Utc::now().with_timezone(&offset)))
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Converts whole hours into a chrono offset
pub fn utc_offset(hours: i32) -> OutputResult<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or(OutputError::InvalidOffset(hours))
}

/// Writes snapshots as pretty-printed JSON to a file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for JsonFileSink {
    fn write(&self, snapshot: &Snapshot) -> OutputResult<()> {
        if snapshot.is_empty() {
            return Err(OutputError::Empty(self.path.clone()));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| OutputError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut json = serde_json::to_string_pretty(snapshot)?;
        json.push('\n');

        fs::write(&self.path, json).map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote {} entities to {}",
            snapshot.total_count,
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads a snapshot written by [`JsonFileSink`]
///
/// # Errors
///
/// Returns an `OutputError` if the file cannot be read or is not a snapshot.
pub fn read_snapshot(path: &Path) -> OutputResult<Snapshot> {
    let content = fs::read_to_string(path).map_err(|source| OutputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
