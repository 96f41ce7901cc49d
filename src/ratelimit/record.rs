//! Per-key window state.

use serde::Serialize;

/// Longest window whose expiry still fits an epoch-millis `i64`.
pub const MAX_WINDOW_MS: u64 = i64::MAX as u64;

/// Attempts observed for one key in its current fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Number of allowed attempts in the current window
    pub count: u32,
    /// Epoch millis at which the window expires
    pub reset_time: i64,
}

impl RateLimitRecord {
    /// Open a window at `now` holding the attempt that opened it.
    pub fn open(now: i64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_time: now.saturating_add(i64::try_from(window_ms).unwrap_or(i64::MAX)),
        }
    }

    /// Whether the window has elapsed at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.reset_time <= now
    }
}

/// Snapshot of a key's quota.
///
/// A `reset_time` of 0 means there is no active window for the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Attempts still allowed in the current window
    pub remaining: u32,
    /// Epoch millis at which the window expires, or 0
    pub reset_time: i64,
}

impl RateLimitStatus {
    /// Status of a key with no active window.
    pub fn idle(max_attempts: u32) -> Self {
        Self {
            remaining: max_attempts,
            reset_time: 0,
        }
    }
}
