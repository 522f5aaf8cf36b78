//! Crawler module for listing page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and rate-limit handling
//! - Record extraction with per-field fallback chains
//! - Human-like request pacing
//! - The pagination loop and its early-stop decision

mod coordinator;
mod extractor;
mod fetcher;
mod pacing;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use extractor::{EntityExtractor, Extraction, SkipReason, SkippedCard, StructuralMatcher};
pub use fetcher::{build_http_client, parse_retry_after, FetchClient, FetchError, RetryState};
pub use pacing::Pacer;
