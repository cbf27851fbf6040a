//! Global rate limiter for search API calls
//!
//! Every outbound call passes through [`RateLimiter::acquire`]. Two
//! policies cooperate:
//! - reactive: when the server reports a remaining quota below the floor,
//!   wait until its reported reset instant (plus a margin);
//! - proactive: never record more than the configured ceiling of calls
//!   within the rolling window.
//!
//! All state sits behind one async mutex, held across the sleep, so
//! concurrent callers queue up behind a throttled one.

use crate::config::RateLimitConfig;
use crate::state::{QuotaInfo, RateBudgetState};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest single sleep while waiting for a server reset
///
/// Longer horizons are slept in several steps, re-reading the clock between
/// them, and the quota is kept until the reported instant has passed.
const MAX_RESET_SLEEP: Duration = Duration::from_secs(15 * 60);

/// Shared gate for every API call
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: usize,
    window: Duration,
    quota_floor: u32,
    reset_margin: Duration,
    state: Mutex<RateBudgetState>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            ceiling: config.requests_per_hour.max(1) as usize,
            window: Duration::from_secs(config.window_secs),
            quota_floor: config.quota_floor,
            reset_margin: Duration::from_secs(config.reset_margin_secs),
            state: Mutex::new(RateBudgetState::new()),
        }
    }

    /// Waits until one more call is allowed, then records it
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        // Reactive: hold every call until the reported reset instant
        while let Some(wait) =
            state.time_until_quota_reset(Utc::now(), self.quota_floor, self.reset_margin)
        {
            let nap = wait.min(MAX_RESET_SLEEP);
            tracing::info!(
                "Rate limit low ({} left), sleeping {:.0}s of {:.0}s until reset",
                state.remaining.unwrap_or(0),
                nap.as_secs_f64(),
                wait.as_secs_f64()
            );
            tokio::time::sleep(nap).await;
            if nap == wait {
                state.clear_after_reset();
            }
        }

        // Proactive: rolling window ceiling
        while let Some(wait) = state.time_until_slot(Instant::now(), self.window, self.ceiling) {
            tracing::info!(
                "Rate limit reached ({} calls in window), sleeping {:.0}s",
                self.ceiling,
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }

        state.record_call(Instant::now());
    }

    /// Refreshes the reactive state from a response's quota telemetry
    ///
    /// A response without telemetry leaves the limiter on its proactive
    /// policy.
    pub async fn update_from_response(&self, quota: Option<QuotaInfo>) {
        if let Some(quota) = quota {
            tracing::trace!(
                "Quota update: {} remaining, reset at {:?}",
                quota.remaining,
                quota.reset_at
            );
            self.state.lock().await.record_quota(quota);
        }
    }

    /// Returns a copy of the current budget state
    pub async fn snapshot(&self) -> RateBudgetState {
        self.state.lock().await.clone()
    }
}
