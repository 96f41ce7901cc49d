//! Core fixed-window rate limiter.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::clock::{Clock, SystemClock};
use super::record::{RateLimitRecord, RateLimitStatus, MAX_WINDOW_MS};
use crate::config::LimitConfig;
use crate::error::{Result, ThrottleError};

/// A fixed-window rate limiter over string keys.
///
/// Each key gets `max_attempts` allowed calls per window. The window opens on
/// the first call for the key and lasts `window_ms`; it is not sliding, so a
/// burst straddling a window boundary can pass up to twice the limit.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter {
    /// Window state indexed by key
    records: Mutex<HashMap<String, RateLimitRecord>>,
    /// Allowed attempts per window
    max_attempts: u32,
    /// Window length in milliseconds
    window_ms: u64,
    /// Label used in log output
    name: Option<String>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter on the system clock.
    pub fn new(max_attempts: u32, window_ms: u64) -> Result<Self> {
        Self::with_clock(max_attempts, window_ms, Arc::new(SystemClock))
    }

    /// Create a new rate limiter reading time from `clock`.
    pub fn with_clock(max_attempts: u32, window_ms: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ThrottleError::InvalidLimit(
                "max_attempts must be positive".to_string(),
            ));
        }
        if window_ms == 0 {
            return Err(ThrottleError::InvalidLimit(
                "window_ms must be positive".to_string(),
            ));
        }
        if window_ms > MAX_WINDOW_MS {
            return Err(ThrottleError::InvalidLimit(format!(
                "window_ms must not exceed {}",
                MAX_WINDOW_MS
            )));
        }

        Ok(Self {
            records: Mutex::new(HashMap::new()),
            max_attempts,
            window_ms,
            name: None,
            clock,
        })
    }

    /// Build a limiter from its configuration block.
    pub fn from_config(config: &LimitConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_clock(config.max_attempts, config.window_ms, clock)
    }

    /// Attach a name that is reported alongside rejected keys.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record an attempt for `key` and report whether it may proceed.
    ///
    /// Returns `true` if the attempt is within the limit, `false` if the
    /// key has used up its window. A rejected attempt does not count.
    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut records = self.records.lock();

        trace!(limiter = self.label(), key = %key, "Checking rate limit");

        if let Some(record) = records.get_mut(key) {
            if !record.is_expired(now) {
                if record.count >= self.max_attempts {
                    warn!(
                        limiter = self.label(),
                        key = %key,
                        count = record.count,
                        reset_time = record.reset_time,
                        "Rate limit exceeded"
                    );
                    return false;
                }
                record.count += 1;
                return true;
            }
        }

        // Unseen or expired: this attempt opens a new window
        let record = RateLimitRecord::open(now, self.window_ms);
        debug!(
            limiter = self.label(),
            key = %key,
            reset_time = record.reset_time,
            "Opening rate limit window"
        );
        records.insert(key.to_string(), record);
        true
    }

    /// Forget everything about `key`.
    pub fn reset(&self, key: &str) {
        if self.records.lock().remove(key).is_some() {
            debug!(limiter = self.label(), key = %key, "Rate limit reset");
        }
    }

    /// Report the remaining quota for `key` without recording an attempt.
    pub fn get_status(&self, key: &str) -> RateLimitStatus {
        let now = self.clock.now_ms();
        let records = self.records.lock();

        match records.get(key) {
            Some(record) if !record.is_expired(now) => RateLimitStatus {
                remaining: self.max_attempts.saturating_sub(record.count),
                reset_time: record.reset_time,
            },
            _ => RateLimitStatus::idle(self.max_attempts),
        }
    }

    /// Drop every record whose window has elapsed.
    ///
    /// Returns the number of records removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        let removed = before - records.len();

        if removed > 0 {
            debug!(
                limiter = self.label(),
                removed,
                remaining = records.len(),
                "Purged expired rate limit records"
            );
        }
        removed
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Number of keys currently held, expired or not.
    pub fn tracked_keys(&self) -> usize {
        self.records.lock().len()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("window_ms", &self.window_ms)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    const START: i64 = 1_700_000_000_000;

    fn limiter_at(max_attempts: u32, window_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = RateLimiter::with_clock(max_attempts, window_ms, clock.clone()).unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_rejects_zero_limits() {
        assert!(matches!(
            RateLimiter::new(0, 1_000),
            Err(ThrottleError::InvalidLimit(_))
        ));
        assert!(matches!(
            RateLimiter::new(5, 0),
            Err(ThrottleError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_rejects_window_past_epoch_range() {
        assert!(matches!(
            RateLimiter::new(1, u64::MAX),
            Err(ThrottleError::InvalidLimit(_))
        ));
        assert!(matches!(
            RateLimiter::new(1, MAX_WINDOW_MS + 1),
            Err(ThrottleError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_longest_window_still_limits() {
        let (limiter, clock) = limiter_at(1, MAX_WINDOW_MS);

        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
        clock.advance(1_000_000);
        assert!(!limiter.check("k"));
        assert_eq!(limiter.get_status("k").reset_time, i64::MAX);
    }

    #[test]
    fn test_fresh_key_allowed() {
        let (limiter, _clock) = limiter_at(5, 60_000);

        assert!(limiter.check("fresh"));

        let status = limiter.get_status("fresh");
        assert_eq!(status.remaining, 4);
        assert_eq!(status.reset_time, START + 60_000);
    }

    #[test]
    fn test_exhaustion_boundary() {
        let (limiter, _clock) = limiter_at(3, 60_000);

        for i in 1..=3 {
            assert!(limiter.check("k"), "attempt {} should be allowed", i);
        }
        assert!(!limiter.check("k"));
        // Rejections do not consume anything further
        assert!(!limiter.check("k"));
        assert_eq!(limiter.get_status("k").remaining, 0);
    }

    #[test]
    fn test_window_rollover() {
        let (limiter, clock) = limiter_at(3, 60_000);

        for _ in 0..3 {
            assert!(limiter.check("k"));
        }
        assert!(!limiter.check("k"));

        // Expiry is inclusive of reset_time
        clock.advance(60_000);
        assert!(limiter.check("k"));

        let status = limiter.get_status("k");
        assert_eq!(status.remaining, 2);
        assert_eq!(status.reset_time, START + 120_000);
    }

    #[test]
    fn test_window_anchored_to_first_attempt() {
        let (limiter, clock) = limiter_at(2, 1_000);

        assert!(limiter.check("k"));
        clock.advance(900);
        assert!(limiter.check("k"));

        // Later attempts do not extend the window
        assert_eq!(limiter.get_status("k").reset_time, START + 1_000);
    }

    #[test]
    fn test_boundary_straddling_burst_passes_twice_the_limit() {
        let (limiter, clock) = limiter_at(5, 1_000);

        let mut allowed = 0;
        if limiter.check("burst") {
            allowed += 1;
        }

        // Spend the rest of the first window just before it closes
        clock.advance(999);
        for _ in 0..10 {
            if limiter.check("burst") {
                allowed += 1;
            }
        }

        // And a full new window immediately after
        clock.advance(1);
        for _ in 0..10 {
            if limiter.check("burst") {
                allowed += 1;
            }
        }

        // Fixed window: 2x max_attempts within a single window_ms span
        assert_eq!(allowed, 10);
    }

    #[test]
    fn test_reset_behaves_like_unseen_key() {
        let (limiter, _clock) = limiter_at(2, 60_000);

        limiter.check("k");
        limiter.check("k");
        assert!(!limiter.check("k"));

        limiter.reset("k");
        assert_eq!(limiter.get_status("k"), RateLimitStatus::idle(2));
        assert!(limiter.check("k"));
        assert_eq!(limiter.get_status("k").remaining, 1);
    }

    #[test]
    fn test_reset_absent_key_is_noop() {
        let (limiter, _clock) = limiter_at(2, 60_000);
        limiter.reset("never-seen");
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_status_for_unknown_and_expired_keys() {
        let (limiter, clock) = limiter_at(4, 500);

        assert_eq!(
            limiter.get_status("nobody"),
            RateLimitStatus {
                remaining: 4,
                reset_time: 0
            }
        );

        limiter.check("k");
        clock.advance(500);
        assert_eq!(limiter.get_status("k"), RateLimitStatus::idle(4));
        // get_status never purges
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_cleanup_purges_only_expired() {
        let (limiter, clock) = limiter_at(5, 1_000);

        limiter.check("old");
        clock.advance(600);
        limiter.check("new");
        limiter.check("new");
        clock.advance(400);

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_keys(), 1);

        let status = limiter.get_status("new");
        assert_eq!(status.remaining, 3);
        assert_eq!(status.reset_time, START + 1_600);

        // Idempotent
        assert_eq!(limiter.cleanup(), 0);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter_at(1, 60_000);

        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn test_login_scenario() {
        let (limiter, clock) = limiter_at(5, 900_000);
        let first = clock.now_ms();

        for _ in 0..5 {
            assert!(limiter.check("user@example.com"));
            clock.advance(1_000);
        }
        assert!(!limiter.check("user@example.com"));

        assert_eq!(
            limiter.get_status("user@example.com"),
            RateLimitStatus {
                remaining: 0,
                reset_time: first + 900_000
            }
        );
    }

    #[test]
    fn test_clear_drops_all_records() {
        let (limiter, _clock) = limiter_at(5, 60_000);
        limiter.check("a");
        limiter.check("b");
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.clear();
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_named_limiter() {
        let (limiter, _clock) = limiter_at(5, 60_000);
        let limiter = limiter.named("login");
        assert_eq!(limiter.name(), Some("login"));
        assert_eq!(limiter.max_attempts(), 5);
        assert_eq!(limiter.window_ms(), 60_000);
    }
}
