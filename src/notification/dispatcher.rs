use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::channels::{ChannelAdapters, EmailMessage, PushMessage, SmsMessage};
use crate::config::DispatchSettings;
use crate::metrics::{ChannelMetrics, DispatchMetrics};
use crate::queue::{QueueSubmissionError, QueueSubmitter};

use super::builder::{build_envelopes, RawNotificationRequest, ValidationError};
use super::types::{ChannelType, NotificationEnvelope};

/// How accepted notifications leave the service.
///
/// Chosen once at startup and never re-evaluated per request.
#[derive(Clone)]
pub enum DispatchMode {
    /// Submit to the durable queue; a downstream worker delivers
    Queued(QueueSubmitter),
    /// Invoke the channel adapters inline
    Direct(ChannelAdapters),
}

impl DispatchMode {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchMode::Queued(_) => "queued",
            DispatchMode::Direct(_) => "direct",
        }
    }
}

/// A channel adapter reported failure during direct delivery
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{channel} delivery failed: {reason}")]
pub struct ChannelDeliveryFailure {
    pub channel: ChannelType,
    pub reason: String,
}

/// Outcome of dispatching one envelope.
///
/// `Queued` means the queue accepted the message, not that it was delivered.
/// Direct delivery is best-effort and may end `Undelivered`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DispatchReceipt {
    Queued { id: Uuid },
    Delivered { id: Uuid },
    Undelivered { id: Uuid, failure: ChannelDeliveryFailure },
}

impl DispatchReceipt {
    pub fn id(&self) -> Uuid {
        match self {
            DispatchReceipt::Queued { id }
            | DispatchReceipt::Delivered { id }
            | DispatchReceipt::Undelivered { id, .. } => *id,
        }
    }

    /// Status string reported to HTTP callers
    pub fn status(&self) -> &'static str {
        match self {
            DispatchReceipt::Queued { .. } => "queued",
            DispatchReceipt::Delivered { .. } => "sent",
            DispatchReceipt::Undelivered { .. } => "failed",
        }
    }
}

/// Errors returned by the dispatch entry points
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    QueueSubmission(#[from] QueueSubmissionError),
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Envelopes routed (queued or delivered directly)
    pub total_dispatched: AtomicU64,
    /// Envelopes acknowledged by the queue
    pub total_queued: AtomicU64,
    /// Direct deliveries reported successful by an adapter
    pub total_delivered: AtomicU64,
    /// Direct deliveries an adapter reported as failed
    pub total_undelivered: AtomicU64,
    /// Envelopes the queue did not accept
    pub queue_failures: AtomicU64,
    /// Requests rejected before dispatch
    pub validation_failures: AtomicU64,
    /// Bulk dispatch calls
    pub batches: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatched: self.total_dispatched.load(Ordering::Relaxed),
            total_queued: self.total_queued.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_undelivered: self.total_undelivered.load(Ordering::Relaxed),
            queue_failures: self.queue_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatsSnapshot {
    pub total_dispatched: u64,
    pub total_queued: u64,
    pub total_delivered: u64,
    pub total_undelivered: u64,
    pub queue_failures: u64,
    pub validation_failures: u64,
    pub batches: u64,
}

/// Routes validated envelopes to the queue or straight to a channel adapter
pub struct NotificationDispatcher {
    mode: DispatchMode,
    default_email_subject: String,
    default_push_title: String,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(mode: DispatchMode, settings: &DispatchSettings) -> Self {
        tracing::info!(mode = mode.name(), "Notification dispatcher ready");
        Self {
            mode,
            default_email_subject: settings.default_email_subject.clone(),
            default_push_title: settings.default_push_title.clone(),
            stats: DispatcherStats::default(),
        }
    }

    pub fn mode(&self) -> &DispatchMode {
        &self.mode
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.mode, DispatchMode::Queued(_))
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Validate a single request and route it
    #[tracing::instrument(name = "dispatch", skip(self, request), fields(mode = self.mode.name()))]
    pub async fn dispatch(
        &self,
        request: RawNotificationRequest,
    ) -> Result<DispatchReceipt, DispatchError> {
        let envelope = NotificationEnvelope::try_from(request).map_err(|e| self.rejected(e))?;
        Ok(self.dispatch_envelope(&envelope).await?)
    }

    /// Validate a whole bulk request, then route every envelope.
    ///
    /// Nothing is dispatched unless every item is valid.
    #[tracing::instrument(
        name = "dispatch_batch",
        skip(self, requests),
        fields(mode = self.mode.name(), size = requests.len())
    )]
    pub async fn dispatch_batch(
        &self,
        requests: Vec<RawNotificationRequest>,
        max_batch_size: usize,
    ) -> Result<Vec<DispatchReceipt>, DispatchError> {
        let envelopes = build_envelopes(requests, max_batch_size).map_err(|e| self.rejected(e))?;
        Ok(self.dispatch_envelopes(&envelopes).await?)
    }

    /// Route one already-built envelope
    pub async fn dispatch_envelope(
        &self,
        envelope: &NotificationEnvelope,
    ) -> Result<DispatchReceipt, QueueSubmissionError> {
        self.stats.total_dispatched.fetch_add(1, Ordering::Relaxed);

        match &self.mode {
            DispatchMode::Queued(submitter) => match submitter.submit_one(envelope).await {
                Ok(id) => {
                    self.record_queued(envelope.channel_type());
                    Ok(DispatchReceipt::Queued { id })
                }
                Err(e) => {
                    self.record_queue_failure(envelope.channel_type());
                    Err(e)
                }
            },
            DispatchMode::Direct(adapters) => Ok(self.deliver(adapters, envelope).await),
        }
    }

    /// Route already-built envelopes; receipts follow input order
    pub async fn dispatch_envelopes(
        &self,
        envelopes: &[NotificationEnvelope],
    ) -> Result<Vec<DispatchReceipt>, QueueSubmissionError> {
        self.stats.batches.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_dispatched
            .fetch_add(envelopes.len() as u64, Ordering::Relaxed);

        match &self.mode {
            DispatchMode::Queued(submitter) => match submitter.submit_many(envelopes).await {
                Ok(ids) => {
                    for envelope in envelopes {
                        self.record_queued(envelope.channel_type());
                    }
                    Ok(ids
                        .into_iter()
                        .map(|id| DispatchReceipt::Queued { id })
                        .collect())
                }
                Err(e) => {
                    for envelope in envelopes.iter().filter(|env| e.accepted.contains(&env.id())) {
                        self.record_queued(envelope.channel_type());
                    }
                    for envelope in envelopes.iter().filter(|env| !e.accepted.contains(&env.id())) {
                        self.record_queue_failure(envelope.channel_type());
                    }
                    Err(e)
                }
            },
            DispatchMode::Direct(adapters) => Ok(join_all(
                envelopes
                    .iter()
                    .map(|envelope| self.deliver(adapters, envelope)),
            )
            .await),
        }
    }

    /// Invoke the adapter for the envelope's channel.
    ///
    /// Adapter failures become `Undelivered` receipts, never errors.
    async fn deliver(
        &self,
        adapters: &ChannelAdapters,
        envelope: &NotificationEnvelope,
    ) -> DispatchReceipt {
        let id = envelope.id();
        let channel = envelope.channel_type();
        let started = Instant::now();

        tracing::info!(
            action = "notification_processing_sync",
            notification_id = %id,
            channel = %channel,
            to = %envelope.redacted_recipient(),
            "Delivering notification directly"
        );

        let result = match channel {
            ChannelType::Email => {
                let subject = envelope.subject().unwrap_or(&self.default_email_subject);
                let message = EmailMessage::new(envelope.recipient(), subject, envelope.body());
                adapters.email.send_email(&message).await
            }
            ChannelType::Sms => {
                let message = SmsMessage::new(envelope.recipient(), envelope.body());
                adapters.sms.send_sms(&message).await
            }
            ChannelType::Push => {
                let title = envelope.subject().unwrap_or(&self.default_push_title);
                let message = PushMessage {
                    data: envelope.data().cloned(),
                    ..PushMessage::new(envelope.recipient(), title, envelope.body())
                };
                adapters.push.send_push(&message).await
            }
        };

        ChannelMetrics::record_send(
            channel.as_str(),
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        match result {
            Ok(()) => {
                self.stats.total_delivered.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record(channel.as_str(), "direct", "delivered");
                DispatchReceipt::Delivered { id }
            }
            Err(e) => {
                self.stats.total_undelivered.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record(channel.as_str(), "direct", "undelivered");
                tracing::warn!(
                    notification_id = %id,
                    channel = %channel,
                    error = %e,
                    "Direct delivery failed"
                );
                DispatchReceipt::Undelivered {
                    id,
                    failure: ChannelDeliveryFailure {
                        channel,
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn rejected(&self, error: ValidationError) -> ValidationError {
        self.stats.validation_failures.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_validation_failure();
        tracing::warn!(error = %error, "Notification request rejected");
        error
    }

    fn record_queued(&self, channel: ChannelType) {
        self.stats.total_queued.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record(channel.as_str(), "queued", "queued");
    }

    fn record_queue_failure(&self, channel: ChannelType) {
        self.stats.queue_failures.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record(channel.as_str(), "queued", "failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelError, EmailChannel, PushChannel, SmsChannel};
    use crate::queue::MemoryQueueClient;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        emails: Mutex<Vec<EmailMessage>>,
        sms: Mutex<Vec<SmsMessage>>,
        pushes: Mutex<Vec<PushMessage>>,
        fail: bool,
    }

    impl Recorder {
        fn outcome(&self, channel: ChannelType) -> Result<(), ChannelError> {
            if self.fail {
                Err(ChannelError::Rejected {
                    channel,
                    status: 500,
                    body: "provider down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl EmailChannel for Recorder {
        async fn send_email(&self, message: &EmailMessage) -> Result<(), ChannelError> {
            self.emails.lock().unwrap().push(message.clone());
            self.outcome(ChannelType::Email)
        }
    }

    #[async_trait]
    impl SmsChannel for Recorder {
        async fn send_sms(&self, message: &SmsMessage) -> Result<(), ChannelError> {
            self.sms.lock().unwrap().push(message.clone());
            self.outcome(ChannelType::Sms)
        }
    }

    #[async_trait]
    impl PushChannel for Recorder {
        async fn send_push(&self, message: &PushMessage) -> Result<(), ChannelError> {
            self.pushes.lock().unwrap().push(message.clone());
            self.outcome(ChannelType::Push)
        }
    }

    fn direct(recorder: Arc<Recorder>) -> NotificationDispatcher {
        let adapters = ChannelAdapters {
            email: recorder.clone(),
            sms: recorder.clone(),
            push: recorder,
        };
        NotificationDispatcher::new(DispatchMode::Direct(adapters), &DispatchSettings::default())
    }

    fn queued(client: Arc<MemoryQueueClient>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            DispatchMode::Queued(QueueSubmitter::new(client)),
            &DispatchSettings::default(),
        )
    }

    fn raw(kind: &str, to: &str) -> RawNotificationRequest {
        RawNotificationRequest {
            kind: Some(kind.to_string()),
            to: Some(to.to_string()),
            body: Some("hello".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_direct_email_uses_default_subject() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = direct(recorder.clone());

        let receipt = dispatcher.dispatch(raw("email", "a@example.com")).await.unwrap();

        assert!(matches!(receipt, DispatchReceipt::Delivered { .. }));
        let emails = recorder.emails.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].subject, "Notification");
        assert_eq!(emails[0].to, "a@example.com");
    }

    #[tokio::test]
    async fn test_direct_push_maps_fields() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = direct(recorder.clone());

        let mut request = raw("push", "device-token");
        request.subject = Some("Ride".to_string());
        request.data = json!({"rideId": "r1"}).as_object().cloned();

        dispatcher.dispatch(request).await.unwrap();

        let pushes = recorder.pushes.lock().unwrap();
        assert_eq!(pushes[0].token, "device-token");
        assert_eq!(pushes[0].title, "Ride");
        assert_eq!(pushes[0].data.as_ref().unwrap()["rideId"], "r1");
        assert!(recorder.emails.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_failure_is_receipt_not_error() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let dispatcher = direct(recorder);

        let receipt = dispatcher.dispatch(raw("sms", "+15550100")).await.unwrap();

        match receipt {
            DispatchReceipt::Undelivered { failure, .. } => {
                assert_eq!(failure.channel, ChannelType::Sms);
                assert!(failure.reason.contains("provider down"));
            }
            other => panic!("expected undelivered, got {:?}", other),
        }
        assert_eq!(dispatcher.stats().total_undelivered, 1);
    }

    #[tokio::test]
    async fn test_direct_push_without_subject_fails_with_default_title() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let dispatcher = direct(recorder.clone());

        let receipt = dispatcher.dispatch(raw("push", "device-token")).await.unwrap();

        match &receipt {
            DispatchReceipt::Undelivered { failure, .. } => {
                assert_eq!(failure.channel, ChannelType::Push);
            }
            other => panic!("expected undelivered, got {:?}", other),
        }
        assert_eq!(receipt.status(), "failed");

        let pushes = recorder.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].title, "Notification");
        assert_eq!(pushes[0].body, "hello");
    }

    #[tokio::test]
    async fn test_validation_failure_skips_io() {
        let client = Arc::new(MemoryQueueClient::new());
        let dispatcher = queued(client.clone());

        let err = dispatcher.dispatch(raw("fax", "x")).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::UnknownChannel(_))
        ));
        assert!(client.single_messages().is_empty());
        assert_eq!(dispatcher.stats().validation_failures, 1);
    }

    #[tokio::test]
    async fn test_queued_dispatch_returns_envelope_id() {
        let client = Arc::new(MemoryQueueClient::new());
        let dispatcher = queued(client.clone());

        let receipt = dispatcher.dispatch(raw("email", "a@example.com")).await.unwrap();

        let body: serde_json::Value =
            serde_json::from_str(&client.single_messages()[0].body).unwrap();
        assert_eq!(body["id"], receipt.id().to_string());
        assert_eq!(receipt.status(), "queued");
    }

    #[tokio::test]
    async fn test_direct_batch_preserves_order() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = direct(recorder.clone());

        let requests: Vec<_> = (0..5)
            .map(|i| raw("sms", &format!("+1555000{}", i)))
            .collect();
        let receipts = dispatcher.dispatch_batch(requests, 100).await.unwrap();

        assert_eq!(receipts.len(), 5);
        assert!(receipts
            .iter()
            .all(|r| matches!(r, DispatchReceipt::Delivered { .. })));
        assert_eq!(recorder.sms.lock().unwrap().len(), 5);
        assert_eq!(dispatcher.stats().batches, 1);
    }

    #[tokio::test]
    async fn test_batch_with_invalid_item_dispatches_nothing() {
        let client = Arc::new(MemoryQueueClient::new());
        let dispatcher = queued(client.clone());

        let requests = vec![raw("email", "a@example.com"), raw("sms", "")];
        let err = dispatcher.dispatch_batch(requests, 100).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::InvalidItem { index: 1, .. })
        ));
        assert_eq!(client.attempted_batches(), 0);
    }

    #[test]
    fn test_receipt_serialization() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(DispatchReceipt::Queued { id }).unwrap();
        assert_eq!(value, json!({"status": "queued", "id": id.to_string()}));
    }
}
