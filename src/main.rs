use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;

use notification_dispatcher::config::Settings;
use notification_dispatcher::metrics::RateLimitMetrics;
use notification_dispatcher::ratelimit::RateLimiter;
use notification_dispatcher::server::{create_app, AppState};
use notification_dispatcher::telemetry::init_telemetry;

/// How often idle rate limit buckets are swept
const BUCKET_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");
    settings.warn_missing();

    // Create application state
    let state = AppState::from_settings(settings.clone()).await?;
    tracing::info!(
        mode = state.dispatcher.mode().name(),
        "Application state initialized"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start rate limit bucket cleanup in background
    let cleanup_handle = tokio::spawn(run_bucket_cleanup(
        state.rate_limiter.clone(),
        shutdown_rx,
    ));

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
    .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = cleanup_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn run_bucket_cleanup(limiter: Arc<RateLimiter>, mut shutdown: watch::Receiver<bool>) {
    if !limiter.is_enabled() {
        return;
    }

    let mut interval = tokio::time::interval(BUCKET_CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                limiter.cleanup_stale();
                RateLimitMetrics::set_buckets(limiter.stats().buckets);
            }
            _ = shutdown.changed() => {
                tracing::debug!("Rate limit cleanup task stopping");
                break;
            }
        }
    }
}

async fn shutdown_signal_handler(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop background tasks
    let _ = shutdown_tx.send(true);
}
