//! Human-like request pacing
//!
//! Every outbound request is preceded by a pause drawn uniformly from the
//! configured millisecond range.

use crate::config::FetchConfig;
use std::time::Duration;

/// Uniform random delay source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    min_ms: u64,
    max_ms: u64,
}

impl Pacer {
    /// Creates a pacer for `[min_ms, max_ms]`; a reversed range is normalized
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.pacing_min_ms, config.pacing_max_ms)
    }

    /// Draws the next delay
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a freshly drawn delay
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::trace!("Pacing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
