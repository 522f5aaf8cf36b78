//! Output module for aggregating and persisting crawl results
//!
//! This module handles:
//! - Merging per-page records into one deduplicated entity map
//! - Recording crawl statistics and the printed run summary
//! - Writing and reading the JSON snapshot

mod aggregator;
mod snapshot;
pub mod stats;
mod traits;

pub use aggregator::{merge, ResultAggregator};
pub use snapshot::{read_snapshot, utc_offset, JsonFileSink, Snapshot};
pub use stats::{print_run_summary, CrawlStats, RunSummary};
pub use traits::{OutputError, OutputResult, SnapshotSink};
