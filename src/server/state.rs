use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::channels::{create_channel_adapters, ChannelAdapters};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::notification::{DispatchMode, NotificationDispatcher};
use crate::queue::{create_queue_client, QueueSubmitter};
use crate::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Adapters for the direct SMS and push routes
    pub channels: ChannelAdapters,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state from already-built collaborators
    pub fn new(settings: Settings, mode: DispatchMode, channels: ChannelAdapters) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(mode, &settings.dispatch));
        let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit.clone()));

        Self {
            settings: Arc::new(settings),
            dispatcher,
            channels,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    /// Build every long-lived client from configuration.
    ///
    /// The dispatch mode is decided here, once: queued when a queue URL is
    /// configured, direct otherwise.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_client.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let channels = create_channel_adapters(&settings, http);

        let mode = match create_queue_client(&settings.queue).await {
            Some(client) => DispatchMode::Queued(QueueSubmitter::new(client)),
            None => DispatchMode::Direct(channels.clone()),
        };

        Ok(Self::new(settings, mode, channels))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
