//! Per-client rate limiter

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::RateLimitConfig;

use super::token_bucket::TokenBucket;

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        remaining: u32,
        limit: u32,
        reset_at: i64,
    },
    /// Request is denied due to rate limiting
    Denied {
        retry_after: u64,
        limit: u32,
        reset_at: i64,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Rate limiter keyed by client identifier (API key or peer address).
///
/// Each key owns a token bucket holding `max_requests` tokens that refill
/// over `window_seconds`.
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds.max(1))
    }

    /// Check rate limit for a client key
    pub fn check_key(&self, key: &str) -> RateLimitResult {
        let limit = self.config.max_requests;

        if !self.config.enabled {
            return RateLimitResult::Allowed {
                remaining: u32::MAX,
                limit: 0,
                reset_at: 0,
            };
        }

        let window = self.window();
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(limit, window));

        let reset_at = bucket.last_activity() / 1000 + window.as_secs() as i64;

        if bucket.try_consume() {
            RateLimitResult::Allowed {
                remaining: bucket.available(),
                limit,
                reset_at,
            }
        } else {
            RateLimitResult::Denied {
                retry_after: bucket.retry_after(),
                limit,
                reset_at,
            }
        }
    }

    /// Remove buckets idle for longer than one window
    pub fn cleanup_stale(&self) -> usize {
        let ttl_ms = (self.config.window_seconds * 1000) as i64;
        let now = TokenBucket::now_millis();
        let before = self.buckets.len();

        self.buckets
            .retain(|_, bucket| now - bucket.last_activity() < ttl_ms);

        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                buckets = self.buckets.len(),
                "Cleaned up stale rate limit buckets"
            );
        }

        removed
    }

    /// Get statistics about the rate limiter
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            enabled: self.config.enabled,
            buckets: self.buckets.len(),
            max_requests: self.config.max_requests,
            window_seconds: self.config.window_seconds,
        }
    }
}

/// Statistics about the rate limiter
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterStats {
    pub enabled: bool,
    pub buckets: usize,
    pub max_requests: u32,
    pub window_seconds: u64,
}
