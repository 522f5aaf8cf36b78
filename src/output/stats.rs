//! Run statistics and the printed summary block

use crate::output::{OutputResult, Snapshot};
use crate::state::StopReason;
use std::fmt;
use std::time::Duration;

/// Counters accumulated over one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages the controller tried, whatever the outcome
    pub pages_attempted: u32,

    /// Pages that yielded at least one record
    pub pages_succeeded: u32,

    /// Pages fetched whose cards yielded no usable record
    pub pages_empty: u32,

    /// Pages skipped after a terminal fetch error
    pub pages_failed: u32,

    /// Records extracted across all pages, before deduplication
    pub entities_found: usize,

    /// 429 waits taken across all pages
    pub rate_limit_waits: u32,

    /// Extra attempts beyond the first on pages that eventually succeeded
    pub retries: u32,

    pub elapsed_time: Duration,
}

impl CrawlStats {
    /// Percentage of attempted pages that yielded records
    pub fn success_rate(&self) -> f64 {
        if self.pages_attempted == 0 {
            0.0
        } else {
            (self.pages_succeeded as f64 / self.pages_attempted as f64) * 100.0
        }
    }
}

/// Everything the end-of-run summary block reports
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: CrawlStats,
    pub stop_reason: StopReason,
    pub max_pages: u32,

    /// Unique entities in the snapshot
    pub saved_count: usize,

    pub output_location: String,

    /// Error message when the snapshot could not be written
    pub persist_error: Option<String>,
}

impl RunSummary {
    /// Builds the summary of a run whose snapshot write ended in `persisted`
    ///
    /// Nothing counts as saved when the write failed.
    pub fn new(
        stats: CrawlStats,
        stop_reason: StopReason,
        max_pages: u32,
        snapshot: &Snapshot,
        output_location: String,
        persisted: &OutputResult<()>,
    ) -> Self {
        Self {
            stats,
            stop_reason,
            max_pages,
            saved_count: persisted.as_ref().map_or(0, |_| snapshot.total_count),
            output_location,
            persist_error: persisted.as_ref().err().map(|e| e.to_string()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;

        writeln!(f, "=== Crawl Summary ===")?;
        writeln!(f)?;
        writeln!(f, "Pages:")?;
        writeln!(f, "  Page ceiling: {}", self.max_pages)?;
        writeln!(f, "  Attempted: {}", stats.pages_attempted)?;
        writeln!(
            f,
            "  Succeeded: {} ({:.1}%)",
            stats.pages_succeeded,
            stats.success_rate()
        )?;
        writeln!(f, "  Empty: {}", stats.pages_empty)?;
        writeln!(f, "  Failed: {}", stats.pages_failed)?;
        writeln!(f, "  Stopped: {}", self.stop_reason)?;
        writeln!(f)?;
        writeln!(f, "Entities:")?;
        writeln!(f, "  Found: {}", stats.entities_found)?;
        writeln!(f, "  Saved (unique): {}", self.saved_count)?;
        writeln!(f)?;
        writeln!(f, "Network:")?;
        writeln!(f, "  Retries: {}", stats.retries)?;
        writeln!(f, "  Rate-limit waits: {}", stats.rate_limit_waits)?;
        writeln!(
            f,
            "  Elapsed: {:.1}s",
            stats.elapsed_time.as_secs_f64()
        )?;
        writeln!(f)?;

        match &self.persist_error {
            None => write!(
                f,
                "Crawl finished: {} entities written to {}",
                self.saved_count, self.output_location
            ),
            Some(error) => write!(
                f,
                "Crawl failed: snapshot not written to {} ({})",
                self.output_location, error
            ),
        }
    }
}

/// Prints the run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("{}", summary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputError;
    use std::path::PathBuf;

    fn sample_stats() -> CrawlStats {
        CrawlStats {
            pages_attempted: 4,
            pages_succeeded: 3,
            pages_empty: 0,
            pages_failed: 1,
            entities_found: 58,
            rate_limit_waits: 1,
            retries: 2,
            elapsed_time: Duration::from_millis(12_500),
        }
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(sample_stats().success_rate(), 75.0);
        assert_eq!(CrawlStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_summary_success_line() {
        let summary = RunSummary {
            stats: sample_stats(),
            stop_reason: StopReason::ShortPage {
                page: 4,
                records: 10,
                threshold: 24,
            },
            max_pages: 150,
            saved_count: 55,
            output_location: "data/roster.json".to_string(),
            persist_error: None,
        };

        let text = summary.to_string();
        assert!(text.contains("Page ceiling: 150"));
        assert!(text.contains("Succeeded: 3 (75.0%)"));
        assert!(text.contains("Found: 58"));
        assert!(text.contains("Saved (unique): 55"));
        assert!(text.contains("Elapsed: 12.5s"));
        assert!(text.ends_with("Crawl finished: 55 entities written to data/roster.json"));
    }

    #[test]
    fn test_failed_write_saves_nothing() {
        let mut entities = crate::model::EntityMap::new();
        entities.insert("a1".to_string(), "Aoi".to_string());
        let snapshot = Snapshot::stamped(entities, 8).unwrap();
        let persisted: OutputResult<()> =
            Err(OutputError::Empty(PathBuf::from("out.json")));

        let summary = RunSummary::new(
            CrawlStats::default(),
            StopReason::MaxPagesReached { max_pages: 1 },
            1,
            &snapshot,
            "out.json".to_string(),
            &persisted,
        );
        assert_eq!(summary.saved_count, 0);
        assert!(summary.persist_error.is_some());

        let summary = RunSummary::new(
            CrawlStats::default(),
            StopReason::MaxPagesReached { max_pages: 1 },
            1,
            &snapshot,
            "out.json".to_string(),
            &Ok(()),
        );
        assert_eq!(summary.saved_count, 1);
        assert!(summary.persist_error.is_none());
    }

    #[test]
    fn test_summary_failure_line() {
        let summary = RunSummary {
            stats: CrawlStats::default(),
            stop_reason: StopReason::Cancelled { before_page: 1 },
            max_pages: 150,
            saved_count: 0,
            output_location: "out.json".to_string(),
            persist_error: Some("empty".to_string()),
        };

        let text = summary.to_string();
        assert!(text.contains("Stopped: cancelled before page 1"));
        assert!(text.contains("Crawl failed: snapshot not written to out.json (empty)"));
    }
}
