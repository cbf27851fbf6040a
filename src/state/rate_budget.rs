use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Quota telemetry reported by the search API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    /// Calls remaining in the current server window
    pub remaining: u32,

    /// Instant at which the server window resets, if reported
    pub reset_at: Option<DateTime<Utc>>,
}

/// Tracks the call budget shared by every fetch
///
/// Holds both the locally observed call timestamps (proactive throttling)
/// and the last quota the server reported (reactive throttling). Only the
/// rate limiter touches this, always under its lock.
#[derive(Debug, Clone, Default)]
pub struct RateBudgetState {
    /// Timestamps of calls inside the rolling window, oldest first
    pub recent_calls: VecDeque<Instant>,

    /// Last remaining-quota count reported by the server
    pub remaining: Option<u32>,

    /// Last reset instant reported by the server
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateBudgetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops call timestamps that have left the rolling window
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent_calls.front() {
            if now.duration_since(oldest) >= window {
                self.recent_calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until the window has room for one more call
    ///
    /// Returns None if a call can be made now.
    pub fn time_until_slot(
        &mut self,
        now: Instant,
        window: Duration,
        ceiling: usize,
    ) -> Option<Duration> {
        self.prune(now, window);
        if self.recent_calls.len() < ceiling {
            return None;
        }
        // The call that must expire is the one `ceiling` positions from the end
        let blocking = self.recent_calls[self.recent_calls.len() - ceiling];
        Some((blocking + window).saturating_duration_since(now))
    }

    /// Time to wait for the server quota to reset
    ///
    /// Returns None unless the server reported a remaining quota below
    /// `floor` together with a reset instant still in the future
    /// (after adding `margin`).
    pub fn time_until_quota_reset(
        &self,
        now: DateTime<Utc>,
        floor: u32,
        margin: Duration,
    ) -> Option<Duration> {
        let remaining = self.remaining?;
        if remaining >= floor {
            return None;
        }
        let reset_at = self.reset_at?;
        let margin = chrono::Duration::from_std(margin).ok()?;
        // Negative once the reset instant plus margin has passed
        let wait = (reset_at + margin - now).to_std().ok()?;
        (!wait.is_zero()).then_some(wait)
    }

    /// Records one outbound call
    pub fn record_call(&mut self, now: Instant) {
        self.recent_calls.push_back(now);
    }

    /// Refreshes the server-reported quota
    pub fn record_quota(&mut self, quota: QuotaInfo) {
        self.remaining = Some(quota.remaining);
        if quota.reset_at.is_some() {
            self.reset_at = quota.reset_at;
        }
    }

    /// Forgets all bookkeeping after the server window has reset
    pub fn clear_after_reset(&mut self) {
        self.recent_calls.clear();
        self.remaining = None;
        self.reset_at = None;
    }
}
