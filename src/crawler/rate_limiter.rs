//! Global request spacing
//!
//! One [`RateLimiter`] is shared by every outbound request of a crawl. There is
//! no per-host partitioning: the crawler only ever talks to one forum.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between consecutive requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    min_interval: Duration,

    /// When the previous `wait` returned
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter; the first `wait` returns immediately
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Suspends until `min_interval` has passed since the previous call
    /// returned, then records the new request time
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let ready_at = last + self.min_interval;
            if Instant::now() < ready_at {
                tracing::trace!(
                    "Rate limiter sleeping {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                sleep_until(ready_at).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// Time still to wait before the next request may go out
    #[cfg(test)]
    pub fn time_until_ready(&self) -> Duration {
        match self.last_request {
            Some(last) => (last + self.min_interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// The configured spacing
    #[cfg(test)]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
