/// Page outcome definitions for tracking crawl progress
///
/// Every page the controller attempts ends in exactly one of these outcomes.
use std::fmt;

/// Why a page was skipped instead of extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipCause {
    /// Timeouts, connection failures, 5xx or incomplete content on every attempt
    RetriesExhausted,

    /// Rate-limit waits for this page exceeded the configured total
    RateLimited,

    /// Access denied, not found and other responses that are never retried
    Permanent,
}

impl SkipCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetriesExhausted => "retries_exhausted",
            Self::RateLimited => "rate_limited",
            Self::Permanent => "permanent",
        }
    }
}

/// Terminal result of processing one listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Page was fetched and yielded this many records (at least one)
    Extracted { records: usize },

    /// Page was fetched and had record cards, but none of them was usable
    Empty,

    /// Page could not be fetched and contributes nothing
    Skipped { cause: SkipCause },
}

impl PageOutcome {
    /// Classifies a fetched page by how many records it yielded
    pub fn from_records(records: usize) -> Self {
        if records == 0 {
            Self::Empty
        } else {
            Self::Extracted { records }
        }
    }

    /// Returns true if the page contributed records
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }

    /// Returns true if a response body was received, usable or not
    pub fn was_fetched(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    /// Number of records the page contributed
    pub fn records(&self) -> usize {
        match self {
            Self::Extracted { records } => *records,
            Self::Empty | Self::Skipped { .. } => 0,
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted { records } => write!(f, "extracted ({} records)", records),
            Self::Empty => write!(f, "empty (no usable records)"),
            Self::Skipped { cause } => write!(f, "skipped ({})", cause.as_str()),
        }
    }
}
