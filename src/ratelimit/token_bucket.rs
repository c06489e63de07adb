//! Token Bucket algorithm implementation

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Fixed-point scale for fractional tokens
const SCALE: u64 = 1000;

/// Token Bucket for rate limiting.
///
/// Uses atomic operations for lock-free concurrent access.
/// The bucket refills `capacity` tokens evenly over one window.
#[derive(Debug)]
pub struct TokenBucket {
    /// Current number of tokens (scaled by 1000 for precision)
    tokens: AtomicU64,
    /// Last refill timestamp (Unix milliseconds)
    last_refill: AtomicI64,
    /// Last successful or attempted consume (Unix milliseconds)
    last_activity: AtomicI64,
    /// Maximum bucket capacity
    capacity: u32,
    /// Refill window in milliseconds
    window_ms: u64,
}

impl TokenBucket {
    /// Create a full bucket that refills `capacity` tokens per `window`
    pub fn new(capacity: u32, window: Duration) -> Self {
        let now = Self::now_millis();
        Self {
            tokens: AtomicU64::new(capacity as u64 * SCALE),
            last_refill: AtomicI64::new(now),
            last_activity: AtomicI64::new(now),
            capacity,
            window_ms: (window.as_millis() as u64).max(1),
        }
    }

    /// Get current time in milliseconds
    pub fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn refill(&self, now: i64) {
        let last = self.last_refill.load(Ordering::Acquire);
        let elapsed_ms = (now - last).max(0) as u64;
        let added = elapsed_ms * self.capacity as u64 * SCALE / self.window_ms;

        // Leave the clock untouched until a whole milli-token accrues
        if added == 0 {
            return;
        }

        if self
            .last_refill
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let max = self.capacity as u64 * SCALE;
            let _ = self
                .tokens
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                    Some((t + added).min(max))
                });
        }
    }

    /// Try to consume one token from the bucket.
    /// Returns true if a token was available, false otherwise.
    pub fn try_consume(&self) -> bool {
        let now = Self::now_millis();
        self.last_activity.store(now, Ordering::Relaxed);
        self.refill(now);

        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(SCALE))
            .is_ok()
    }

    /// Get the current number of whole tokens available
    pub fn available(&self) -> u32 {
        self.refill(Self::now_millis());
        (self.tokens.load(Ordering::Acquire) / SCALE) as u32
    }

    /// Get seconds until the bucket has at least one token
    pub fn retry_after(&self) -> u64 {
        self.refill(Self::now_millis());
        let tokens = self.tokens.load(Ordering::Acquire);
        if tokens >= SCALE {
            return 0;
        }

        let missing = SCALE - tokens;
        let per_token_ms = self.window_ms * missing / (self.capacity.max(1) as u64 * SCALE);
        per_token_ms.div_ceil(1000).max(1)
    }

    /// Get the last activity time
    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_bucket_basic() {
        let bucket = TokenBucket::new(10, Duration::from_secs(900));

        // Should be able to consume up to capacity
        for _ in 0..10 {
            assert!(bucket.try_consume());
        }

        // Should be empty now
        assert!(!bucket.try_consume());
        assert_eq!(bucket.available(), 0);
    }

    #[test]
    fn test_token_bucket_refill() {
        let bucket = TokenBucket::new(5, Duration::from_millis(5)); // 1 token per ms

        // Consume all tokens
        for _ in 0..5 {
            assert!(bucket.try_consume());
        }

        // Wait a tiny bit for refill
        std::thread::sleep(Duration::from_millis(10));

        // Should have refilled some tokens
        assert!(bucket.try_consume());
    }

    #[test]
    fn test_retry_after_spans_window() {
        // 100 requests per 15 minutes: one token every 9 seconds
        let bucket = TokenBucket::new(100, Duration::from_secs(900));
        for _ in 0..100 {
            assert!(bucket.try_consume());
        }

        let retry = bucket.retry_after();
        assert!((1..=9).contains(&retry), "retry_after = {}", retry);
    }

    #[test]
    fn test_retry_after_when_available() {
        let bucket = TokenBucket::new(1, Duration::from_secs(60));
        assert_eq!(bucket.retry_after(), 0);
    }
}
