//! Service info, health check and statistics endpoints.

use axum::{extract::State, http::Uri, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::notification::DispatcherStatsSnapshot;
use crate::ratelimit::RateLimiterStats;
use crate::server::AppState;

const SERVICE_NAME: &str = "notification-service";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub queue_enabled: bool,
    pub mode: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub queue_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub uptime: u64,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
    pub queue: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub mode: &'static str,
    pub notifications: DispatcherStatsSnapshot,
    pub rate_limit: RateLimiterStats,
}

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        queue_enabled: state.dispatcher.is_queued(),
        mode: state.dispatcher.mode().name(),
        timestamp: Utc::now(),
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        queue_enabled: state.dispatcher.is_queued(),
        timestamp: Utc::now(),
    })
}

/// GET /health/live
pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive",
        service: SERVICE_NAME,
        uptime: state.uptime_seconds(),
    })
}

/// GET /health/ready
///
/// Reports which channels have provider credentials configured.
pub async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let settings = &state.settings;

    Json(ReadinessResponse {
        status: "ready",
        service: SERVICE_NAME,
        checks: ReadinessChecks {
            email: settings.email.api_key.is_some(),
            sms: settings.sms.account_sid.is_some(),
            push: settings.push.project_id.is_some(),
            queue: settings.queue_enabled(),
        },
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.uptime_seconds(),
        mode: state.dispatcher.mode().name(),
        notifications: state.dispatcher.stats(),
        rate_limit: state.rate_limiter.stats(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
