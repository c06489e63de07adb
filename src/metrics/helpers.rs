//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CHANNEL_LATENCY, CHANNEL_SENDS_TOTAL, NOTIFICATIONS_TOTAL, QUEUE_BATCH_SIZE, QUEUE_LATENCY,
    QUEUE_SUBMISSIONS_TOTAL, RATELIMIT_ALLOWED_TOTAL, RATELIMIT_BUCKETS, RATELIMIT_DENIED_TOTAL,
    VALIDATION_FAILURES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record one dispatched notification.
    ///
    /// `mode` is `queued` or `direct`; `outcome` is `queued`, `delivered`,
    /// `undelivered` or `failed`.
    pub fn record(channel: &str, mode: &str, outcome: &str) {
        NOTIFICATIONS_TOTAL
            .with_label_values(&[channel, mode, outcome])
            .inc();
    }

    pub fn record_validation_failure() {
        VALIDATION_FAILURES_TOTAL.inc();
    }
}

/// Helper struct for recording queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_single(success: bool) {
        QUEUE_SUBMISSIONS_TOTAL
            .with_label_values(&["single", outcome(success)])
            .inc();
    }

    pub fn record_batch(success: bool) {
        QUEUE_SUBMISSIONS_TOTAL
            .with_label_values(&["batch", outcome(success)])
            .inc();
    }

    pub fn record_batch_size(size: usize) {
        QUEUE_BATCH_SIZE.observe(size as f64);
    }

    pub fn observe_latency(seconds: f64) {
        QUEUE_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording provider send metrics
pub struct ChannelMetrics;

impl ChannelMetrics {
    pub fn record_send(channel: &str, success: bool, seconds: f64) {
        CHANNEL_SENDS_TOTAL
            .with_label_values(&[channel, outcome(success)])
            .inc();
        CHANNEL_LATENCY.with_label_values(&[channel]).observe(seconds);
    }
}

/// Helper struct for recording rate limit metrics
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    pub fn record_allowed() {
        RATELIMIT_ALLOWED_TOTAL.inc();
    }

    pub fn record_denied() {
        RATELIMIT_DENIED_TOTAL.inc();
    }

    pub fn set_buckets(count: usize) {
        RATELIMIT_BUCKETS.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_metrics() {
        DispatchMetrics::record("email", "queued", "queued");
        DispatchMetrics::record("sms", "direct", "undelivered");
        DispatchMetrics::record_validation_failure();
        // Just verify no panics
    }

    #[test]
    fn test_queue_metrics() {
        QueueMetrics::record_single(true);
        QueueMetrics::record_batch(false);
        QueueMetrics::record_batch_size(10);
        QueueMetrics::observe_latency(0.02);
        // Just verify no panics
    }

    #[test]
    fn test_encode_metrics_contains_prefix() {
        ChannelMetrics::record_send("push", true, 0.1);
        RateLimitMetrics::record_allowed();
        RateLimitMetrics::record_denied();
        RateLimitMetrics::set_buckets(3);

        let output = encode_metrics().unwrap();
        assert!(output.contains("notify_channel_sends_total"));
        assert!(output.contains("notify_ratelimit_buckets"));
    }
}
