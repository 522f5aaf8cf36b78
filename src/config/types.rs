use serde::Deserialize;
use std::time::Duration;

/// User-Agent pool rotated across requests when the config does not supply one
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

/// Main configuration structure for Roster-Crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub pagination: PaginationConfig,
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// Target site and listing coordinates
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host of the listing site, without a trailing path
    pub base_url: String,

    /// First listing coordinate, fixed for the whole run
    pub bucket: String,

    /// Second listing coordinate, fixed for the whole run
    pub subcategory: String,

    /// Referer header sent with every request
    pub referer: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.javrate.com".to_string(),
            bucket: "1".to_string(),
            subcategory: "0".to_string(),
            referer: "https://www.javrate.com/".to_string(),
        }
    }
}

/// HTTP behavior: timeouts, retries, pacing and identity headers
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Attempts allowed per page for transient failures
    pub max_retries: u32,

    /// Fixed delay between transient-failure attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Lower bound of the random pause before each request (milliseconds)
    pub pacing_min_ms: u64,

    /// Upper bound of the random pause before each request (milliseconds)
    pub pacing_max_ms: u64,

    /// Wait used after HTTP 429 when the server sends no Retry-After (milliseconds)
    pub rate_limit_default_wait_ms: u64,

    /// Cap on the summed rate-limit waits for a single request (milliseconds)
    pub rate_limit_max_total_wait_ms: u64,

    /// Cap on the number of rate-limit waits for a single request
    pub rate_limit_max_waits: u32,

    /// User-Agent strings, one picked at random per request
    pub user_agents: Vec<String>,

    /// Accept-Language header value
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 2_000,
            pacing_min_ms: 1_000,
            pacing_max_ms: 3_000,
            rate_limit_default_wait_ms: 30_000,
            rate_limit_max_total_wait_ms: 300_000,
            rate_limit_max_waits: 10,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            accept_language: "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_default_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_default_wait_ms)
    }

    pub fn rate_limit_max_total_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_max_total_wait_ms)
    }
}

/// Page walk limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PaginationConfig {
    /// Hard ceiling on the number of pages visited
    pub max_pages: u32,

    /// Record count of a full listing page; a shorter page ends the crawl
    pub full_page_threshold: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: 150,
            full_page_threshold: 24,
        }
    }
}

/// Selectors and patterns used to pull records out of a listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractConfig {
    /// CSS selectors for record cards, highest priority first
    pub record_selectors: Vec<String>,

    /// Regex with one capture group applied to the primary link href
    pub link_id_pattern: String,

    /// Regex with one capture group applied to the card image src
    pub image_id_pattern: String,

    /// Names treated as missing (compared case-insensitively)
    pub placeholder_names: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            record_selectors: vec![
                "div.actor-card".to_string(),
                "div.col-md-2.col-sm-3.col-xs-4.item".to_string(),
                "div.grid-item.actor".to_string(),
                r#"[class*="actor-card"]"#.to_string(),
            ],
            link_id_pattern: r"/Actor/Detail/([a-f0-9-]+)\.html".to_string(),
            image_id_pattern: r"/actor/([a-f0-9-]+)/".to_string(),
            placeholder_names: vec!["unknown".to_string()],
        }
    }
}

/// Snapshot output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON snapshot file
    pub path: String,

    /// UTC offset (hours) used for the `last_updated` stamp
    pub utc_offset_hours: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "data/javrate_actors.json".to_string(),
            utc_offset_hours: 8,
        }
    }
}
