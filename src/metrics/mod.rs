//! Prometheus metrics for the notification dispatcher.
//!
//! - Dispatch metrics (notifications by channel, delivery mode and outcome)
//! - Queue metrics (submissions, batch sizes, latency)
//! - Channel metrics (provider sends and latency)
//! - Rate limiting metrics

mod helpers;

pub use helpers::{encode_metrics, ChannelMetrics, DispatchMetrics, QueueMetrics, RateLimitMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notify";

lazy_static! {
    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Notifications handled by the dispatcher
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_total", METRIC_PREFIX),
        "Notifications handled by the dispatcher",
        &["channel", "mode", "outcome"]
    ).unwrap();

    /// Requests rejected before dispatch
    pub static ref VALIDATION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_validation_failures_total", METRIC_PREFIX),
        "Notification requests rejected by validation"
    ).unwrap();

    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Queue submission calls by kind (single/batch) and outcome
    pub static ref QUEUE_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_queue_submissions_total", METRIC_PREFIX),
        "Queue submission calls",
        &["kind", "outcome"]
    ).unwrap();

    /// Entries per batch submission call
    pub static ref QUEUE_BATCH_SIZE: Histogram = register_histogram!(
        format!("{}_queue_batch_size", METRIC_PREFIX),
        "Entries per queue batch call",
        vec![1.0, 2.0, 5.0, 8.0, 10.0]
    ).unwrap();

    /// Queue call latency
    pub static ref QUEUE_LATENCY: Histogram = register_histogram!(
        format!("{}_queue_latency_seconds", METRIC_PREFIX),
        "Queue submission latency in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    ).unwrap();

    // ============================================================================
    // Channel Metrics
    // ============================================================================

    /// Provider sends by channel and outcome
    pub static ref CHANNEL_SENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_sends_total", METRIC_PREFIX),
        "Provider send attempts",
        &["channel", "outcome"]
    ).unwrap();

    /// Provider send latency by channel
    pub static ref CHANNEL_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_channel_latency_seconds", METRIC_PREFIX),
        "Provider send latency in seconds",
        &["channel"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Rate Limiting Metrics
    // ============================================================================

    /// Requests allowed by the rate limiter
    pub static ref RATELIMIT_ALLOWED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_allowed_total", METRIC_PREFIX),
        "Requests allowed by the rate limiter"
    ).unwrap();

    /// Requests denied by the rate limiter
    pub static ref RATELIMIT_DENIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_denied_total", METRIC_PREFIX),
        "Requests denied by the rate limiter"
    ).unwrap();

    /// Active rate limit buckets
    pub static ref RATELIMIT_BUCKETS: IntGauge = register_int_gauge!(
        format!("{}_ratelimit_buckets", METRIC_PREFIX),
        "Number of active rate limit buckets"
    ).unwrap();

    // ============================================================================
    // Process Metrics
    // ============================================================================

    /// Seconds since the server started
    pub static ref UPTIME_SECONDS: IntGauge = register_int_gauge!(
        format!("{}_uptime_seconds", METRIC_PREFIX),
        "Seconds since the server started"
    ).unwrap();
}
