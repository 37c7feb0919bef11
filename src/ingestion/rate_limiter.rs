use crate::metrics::PollMetrics;
use crate::types::RateLimitStatus;
use std::time::Duration;
use tracing::warn;

/// Reactive back-off on the search quota.
///
/// Nothing is rationed up front: once a response reports the window as spent,
/// the caller sleeps until the window resets.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter;

impl RateLimiter {
    pub fn new() -> Self {
        Self
    }

    /// How long the caller has to back off after a response carrying `status`.
    pub fn wait_for(&self, status: &RateLimitStatus) -> Option<Duration> {
        if status.is_exhausted() {
            Some(Duration::from_secs(status.seconds_until_reset))
        } else {
            None
        }
    }

    /// Sleep out an exhausted window; returns the time slept, if any.
    pub async fn check_and_wait(&self, status: &RateLimitStatus) -> Option<Duration> {
        let wait = self.wait_for(status)?;
        warn!(
            "search quota exhausted, waiting {}s for the window to reset",
            wait.as_secs()
        );
        PollMetrics::record_rate_limit_wait(wait.as_secs_f64());
        tokio::time::sleep(wait).await;
        Some(wait)
    }
}
