//! Result aggregation across pages
//!
//! Records from every page are folded into a single [`EntityMap`] keyed by
//! identifier, in page order, while run statistics accumulate alongside.

use crate::model::{EntityMap, EntityRecord, RawPage};
use crate::output::CrawlStats;
use crate::state::PageOutcome;
use std::time::Instant;

/// Folds records into the map, keyed by identifier
///
/// Merging is idempotent: a record already present only has its name
/// overwritten by the later value.
pub fn merge<I>(mut map: EntityMap, records: I) -> EntityMap
where
    I: IntoIterator<Item = EntityRecord>,
{
    for record in records {
        map.insert(record.identifier, record.name);
    }
    map
}

/// Running entity map and statistics for one crawl
#[derive(Debug)]
pub struct ResultAggregator {
    entities: EntityMap,
    stats: CrawlStats,
    started: Instant,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            entities: EntityMap::new(),
            stats: CrawlStats::default(),
            started: Instant::now(),
        }
    }

    /// Merges one page worth of records, returning how many identifiers were new
    pub fn merge_page(&mut self, records: Vec<EntityRecord>) -> usize {
        let before = self.entities.len();
        let entities = std::mem::take(&mut self.entities);
        self.entities = merge(entities, records);
        self.entities.len() - before
    }

    /// Adds the retry and rate-limit counts of a completed fetch
    pub fn record_fetch(&mut self, page: &RawPage) {
        self.stats.retries += page.attempts.saturating_sub(1);
        self.stats.rate_limit_waits += page.rate_limit_waits;
    }

    /// Counts a page transition
    pub fn record_page(&mut self, outcome: &PageOutcome) {
        self.stats.pages_attempted += 1;
        self.stats.entities_found += outcome.records();
        match outcome {
            PageOutcome::Extracted { .. } => self.stats.pages_succeeded += 1,
            PageOutcome::Empty => self.stats.pages_empty += 1,
            PageOutcome::Skipped { .. } => self.stats.pages_failed += 1,
        }
    }

    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    /// Stops the clock and hands over the merged map and final statistics
    pub fn finish(mut self) -> (EntityMap, CrawlStats) {
        self.stats.elapsed_time = self.started.elapsed();
        (self.entities, self.stats)
    }
}
