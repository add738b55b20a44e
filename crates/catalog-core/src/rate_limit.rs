//! Remote API rate-limit status
//!
//! Advisory only: nothing in the engine refuses to run because the budget
//! is low.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rate-limit window reported by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimitStatus {
    pub fn new(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> Self {
        Self {
            limit,
            remaining: remaining.min(limit),
            reset_at,
        }
    }

    pub fn used(&self) -> u32 {
        self.limit.saturating_sub(self.remaining)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Time until reset, zero once the reset time has passed
    pub fn resets_in(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).max(Duration::zero())
    }
}
