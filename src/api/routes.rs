use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{rate_limit_middleware, AppState};

use super::health::{health, liveness, readiness, service_info, stats};
use super::metrics::prometheus_metrics;
use super::notifications::{send_bulk, send_notification};
use super::push::{send_bulk_push, send_push};
use super::sms::send_sms;

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Public submission routes share one per-client budget
    let limited = Router::new()
        .route("/api/notifications/send", post(send_notification))
        .route("/api/notifications/send-bulk", post(send_bulk))
        .route("/api/notifications/sms", post(send_sms))
        .route("/api/push/send", post(send_push))
        .route("/api/push/send-bulk", post(send_bulk_push))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware));

    Router::new()
        // Service info, health & stats
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Internal service-to-service route
        .route("/notifications/sms", post(send_sms))
        .merge(limited)
}
