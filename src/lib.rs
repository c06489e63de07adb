// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod channels;
pub mod notification;
pub mod queue;
pub mod ratelimit;

// Application layer
pub mod api;
pub mod server;
