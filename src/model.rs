//! Core records passed between the fetcher, extractor and aggregator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier -> display name. Ordered so snapshots serialize deterministically.
pub type EntityMap = BTreeMap<String, String>;

/// A fetched listing page, alive only until it has been extracted
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Page body as text
    pub content: String,

    /// When the successful response was received
    pub fetched_at: DateTime<Utc>,

    /// HTTP attempts spent on transient failures, including the successful one
    pub attempts: u32,

    /// Number of rate-limit waits before success
    pub rate_limit_waits: u32,
}

impl RawPage {
    /// Wraps content fetched just now in a single attempt
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fetched_at: Utc::now(),
            attempts: 1,
            rate_limit_waits: 0,
        }
    }
}

/// One entity found on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Whitespace-normalized display name; may repeat across identifiers
    pub name: String,

    /// Site-assigned token that identifies the entity
    pub identifier: String,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

/// Collapses whitespace runs into single spaces and trims the ends
///
/// ```
/// use roster_crawler::model::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  Aoi \n\t Sora "), "Aoi Sora");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
