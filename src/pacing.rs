// src/pacing.rs

//! Request pacing shared across concurrent requests.
//!
//! One controller per target source: every page fetch, regardless of which
//! logical request issues it, passes through the same rate limiter so the
//! aggregate request rate stays within the target's tolerance. Only the
//! scheduling decision is serialized; the fetches themselves are not.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

use crate::models::PacingConfig;

/// Throttles page fetches and schedules retry backoff.
pub struct PacingController {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
    base_delay: Duration,
}

impl PacingController {
    pub fn new(config: &PacingConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second)
            .unwrap_or(NonZeroU32::new(1).expect("1 is non-zero"));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Wait until the shared rate budget admits one more request.
    ///
    /// No reservation is held afterwards: cancelling a request between
    /// steps cannot corrupt the budget.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Retry attempts allowed per page beyond the first try.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Exponential backoff delay before retry `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Sleep out the backoff before retry `attempt`.
    pub async fn back_off(&self, attempt: u32) {
        let delay = self.backoff_delay(attempt);
        log::debug!("pacing: backing off {}ms before retry {attempt}", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}
