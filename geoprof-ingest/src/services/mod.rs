//! Remote source clients
//!
//! One client per source family style: `CensusFetcher` covers the
//! decennial-count and survey-estimate families (same query protocol,
//! different base URL and variables), `HealthFetcher` covers the
//! health-measure family. Both implement the narrow [`SourceFetcher`]
//! boundary so the pipeline never builds requests itself.
//!
//! [`SourceFetcher`]: crate::types::SourceFetcher

pub mod census_client;
pub mod health_client;

pub use census_client::CensusFetcher;
pub use health_client::HealthFetcher;

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Minimum interval between requests to one source host
const RATE_LIMIT_MS: u64 = 1000;

/// Request timeout applied to both clients
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate limiter enforcing a minimum interval between requests
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(RATE_LIMIT_MS),
        }
    }

    /// Wait if necessary to comply with the rate limit
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}
