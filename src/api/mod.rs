//! API layer - HTTP endpoint handlers organized by domain.

mod extract;
mod health;
mod metrics;
mod notifications;
mod push;
mod routes;
mod sms;

// Re-export all handlers for use in server/app.rs
pub use extract::ApiJson;
pub use health::{health, liveness, not_found, readiness, service_info, stats};
pub use metrics::prometheus_metrics;
pub use notifications::{send_bulk, send_notification};
pub use push::{send_bulk_push, send_push};
pub use routes::api_routes;
pub use sms::send_sms;
