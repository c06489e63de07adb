//! Queue client factory

use std::sync::Arc;

use crate::config::QueueSettings;

use super::client::QueueClient;
use super::memory::MemoryQueueClient;
use super::sqs::SqsQueueClient;

const MEMORY_SCHEME: &str = "memory://";

/// Create a queue client based on configuration.
///
/// Returns:
/// - `None` when no queue URL is configured (direct delivery mode)
/// - a `MemoryQueueClient` for `memory://` URLs
/// - an `SqsQueueClient` for anything else
///
/// Called once at startup; the decision between queued and direct delivery is
/// never re-evaluated per request.
pub async fn create_queue_client(settings: &QueueSettings) -> Option<Arc<dyn QueueClient>> {
    let url = settings.url.as_deref().filter(|u| !u.trim().is_empty())?;

    if url.starts_with(MEMORY_SCHEME) {
        tracing::info!(backend = "memory", "Creating in-memory queue client");
        return Some(Arc::new(MemoryQueueClient::new()));
    }

    tracing::info!(
        backend = "sqs",
        region = %settings.region,
        queue_url = %url,
        "Creating SQS queue client"
    );
    Some(Arc::new(SqsQueueClient::from_env(&settings.region, url).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_means_direct_mode() {
        let settings = QueueSettings::default();
        assert!(create_queue_client(&settings).await.is_none());

        let settings = QueueSettings {
            url: Some("  ".to_string()),
            ..QueueSettings::default()
        };
        assert!(create_queue_client(&settings).await.is_none());
    }

    #[tokio::test]
    async fn test_memory_url() {
        let settings = QueueSettings {
            url: Some("memory://local".to_string()),
            ..QueueSettings::default()
        };
        let client = create_queue_client(&settings).await.unwrap();
        assert_eq!(client.backend(), "memory");
    }
}
