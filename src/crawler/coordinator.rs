//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the pagination loop that ties the crawl together:
//! - Building one page URL per iteration from the listing template
//! - Fetching it through the [`FetchClient`]
//! - Extracting records and merging them into the running result
//! - Deciding from the page size whether the listing has run out
//! - Honoring cancellation between pages
//!
//! Pages are processed strictly one after another; page `n + 1` is never
//! requested before page `n` has a [`PageOutcome`].

use crate::config::{validate, Config};
use crate::crawler::extractor::EntityExtractor;
use crate::crawler::fetcher::FetchClient;
use crate::crawler::pacing::Pacer;
use crate::model::EntityMap;
use crate::output::{CrawlStats, ResultAggregator};
use crate::state::{ControllerState, PageOutcome, StopReason};
use crate::url::{ListingTemplate, PageRequest};
use crate::CrawlerError;
use tokio_util::sync::CancellationToken;

/// Everything a finished (or cancelled) run hands to the sink
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Merged `identifier -> name` map in identifier order
    pub entities: EntityMap,
    pub stats: CrawlStats,
    pub stop_reason: StopReason,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    template: ListingTemplate,
    fetcher: FetchClient,
    extractor: EntityExtractor,
    pacer: Pacer,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration, validated here
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - The configuration failed validation, or the
    ///   HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, CrawlerError> {
        validate(&config)?;
        let template = ListingTemplate::new(&config.site)?;
        let extractor = EntityExtractor::new(&config.extract)?;
        let fetcher = FetchClient::new(&config, extractor.clone())?;
        let pacer = Pacer::from_config(&config.fetch);

        Ok(Self {
            config,
            template,
            fetcher,
            extractor,
            pacer,
            cancel: CancellationToken::new(),
        })
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run before its next page
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the page walk until the listing runs out, the page ceiling is
    /// reached, or the run is cancelled
    ///
    /// Skipped pages are logged and counted but never abort the run, so the
    /// partial result is always returned.
    pub async fn run(&self) -> Result<CrawlOutcome, CrawlerError> {
        tracing::info!(
            "Starting crawl of {} (at most {} pages)",
            self.template,
            self.config.pagination.max_pages
        );

        let mut aggregator = ResultAggregator::new();
        let mut state = ControllerState::Init.start();

        while let ControllerState::Fetching { page } = state {
            if self.cancel.is_cancelled() {
                state = state.cancel();
                break;
            }

            let request = self.template.page(page)?;
            let outcome = self.process_page(&request, &mut aggregator).await;
            aggregator.record_page(&outcome);

            state = state.after_page(&outcome, &self.config.pagination);

            match state {
                ControllerState::Stopped(reason) => {
                    tracing::info!("Stopping after page {}: {}", page, reason);
                }
                ControllerState::Fetching { .. } if outcome.was_fetched() => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {}
                        _ = self.pacer.pause() => {}
                    }
                }
                _ => {}
            }
        }

        let stop_reason = match state.stop_reason() {
            Some(reason) => reason,
            None => StopReason::MaxPagesReached {
                max_pages: self.config.pagination.max_pages,
            },
        };

        let (entities, stats) = aggregator.finish();

        tracing::info!(
            "Crawl completed: {}/{} pages succeeded, {} unique entities in {:.1}s",
            stats.pages_succeeded,
            stats.pages_attempted,
            entities.len(),
            stats.elapsed_time.as_secs_f64()
        );

        Ok(CrawlOutcome {
            entities,
            stats,
            stop_reason,
        })
    }

    /// Fetches, extracts and merges one page
    async fn process_page(
        &self,
        request: &PageRequest,
        aggregator: &mut ResultAggregator,
    ) -> PageOutcome {
        tracing::debug!("Processing page {}: {}", request.page_number, request.url);

        let page = match self.fetcher.fetch(&request.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Skipping page {}: {}", request.page_number, e);
                return PageOutcome::Skipped {
                    cause: e.skip_cause(),
                };
            }
        };

        aggregator.record_fetch(&page);

        let records = self.extractor.extract(&page);
        let found = records.len();
        let added = aggregator.merge_page(records);

        let outcome = PageOutcome::from_records(found);
        if outcome.is_success() {
            tracing::info!(
                "Page {}: {} records ({} new, {} total)",
                request.page_number,
                found,
                added,
                aggregator.entities().len()
            );
        } else {
            tracing::warn!("Page {}: no usable records, moving on", request.page_number);
        }

        outcome
    }
}

/// Runs a complete crawl with a fresh cancellation token
///
/// # Example
///
/// ```no_run
/// use roster_crawler::config::Config;
/// use roster_crawler::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = run_crawl(Config::default()).await?;
/// println!("{} entities", outcome.entities.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, CrawlerError> {
    Coordinator::new(config)?.run().await
}
