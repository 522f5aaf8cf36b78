//! Output sink trait and error types

use crate::output::Snapshot;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Refusing to write an empty snapshot to {}", .0.display())]
    Empty(PathBuf),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to format snapshot: {0}")]
    Format(#[from] serde_json::Error),

    #[error("UTC offset of {0} hours is out of range")]
    InvalidOffset(i32),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the final snapshot of a run
pub trait SnapshotSink {
    /// Persists the snapshot
    ///
    /// # Errors
    ///
    /// Returns an `OutputError` if the snapshot cannot be written. An empty
    /// snapshot is rejected so that a failed run never replaces good data.
    fn write(&self, snapshot: &Snapshot) -> OutputResult<()>;

    /// Human-readable location of the sink, for the run summary
    fn location(&self) -> String;
}
