//! Priority-aware submission of envelopes onto the durable queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::QueueMetrics;
use crate::notification::{NotificationEnvelope, Priority};

use super::batch::split;
use super::client::{BatchEntry, MessageAttributes, OutboundMessage, QueueClient, QueueError};

/// Maximum entries per physical batch call, fixed by the queue transport
pub const MAX_BATCH_ENTRIES: usize = 10;

/// Queue submission failed.
///
/// `accepted` holds every envelope id the queue acknowledged before the
/// failure, in input order. Those messages are not rolled back.
#[derive(Debug, Error)]
#[error("Queue submission failed after {} accepted: {source}", .accepted.len())]
pub struct QueueSubmissionError {
    pub accepted: Vec<Uuid>,
    pub source: QueueError,
}

impl QueueSubmissionError {
    fn new(accepted: Vec<Uuid>, source: QueueError) -> Self {
        Self { accepted, source }
    }
}

/// Serializes envelopes onto a [`QueueClient`].
///
/// Bulk submissions are split into batches of [`MAX_BATCH_ENTRIES`] and sent
/// one after another. The first failing batch aborts the call (fail-fast).
#[derive(Clone)]
pub struct QueueSubmitter {
    client: Arc<dyn QueueClient>,
}

impl QueueSubmitter {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self { client }
    }

    /// Backend name of the underlying client
    pub fn backend(&self) -> &'static str {
        self.client.backend()
    }

    /// Submit a single envelope; returns its id once the queue acknowledges it
    #[tracing::instrument(
        name = "queue.submit_one",
        skip(self, envelope),
        fields(
            notification_id = %envelope.id(),
            channel = %envelope.channel_type(),
            priority = %envelope.priority()
        )
    )]
    pub async fn submit_one(&self, envelope: &NotificationEnvelope) -> Result<Uuid, QueueSubmissionError> {
        let started = Instant::now();
        let message = outbound_message(envelope, Utc::now())
            .map_err(|e| QueueSubmissionError::new(Vec::new(), e))?;

        let result = self.client.submit_message(message).await;
        QueueMetrics::observe_latency(started.elapsed().as_secs_f64());

        match result {
            Ok(ack) => {
                QueueMetrics::record_single(true);
                tracing::info!(
                    action = "notification_queued",
                    notification_id = %envelope.id(),
                    queue_message_id = ?ack.message_id,
                    channel = %envelope.channel_type(),
                    priority = %envelope.priority(),
                    "Notification queued"
                );
                Ok(envelope.id())
            }
            Err(e) => {
                QueueMetrics::record_single(false);
                tracing::error!(
                    notification_id = %envelope.id(),
                    error = %e,
                    "Failed to queue notification"
                );
                Err(QueueSubmissionError::new(Vec::new(), e))
            }
        }
    }

    /// Submit many envelopes in batches of at most [`MAX_BATCH_ENTRIES`].
    ///
    /// Batches are issued in order and batch `n + 1` is only sent after batch
    /// `n` was acknowledged. On the first failed batch the remaining batches
    /// are skipped and the ids accepted so far are returned inside the error.
    #[tracing::instrument(
        name = "queue.submit_many",
        skip(self, envelopes),
        fields(count = envelopes.len())
    )]
    pub async fn submit_many(
        &self,
        envelopes: &[NotificationEnvelope],
    ) -> Result<Vec<Uuid>, QueueSubmissionError> {
        let mut accepted = Vec::with_capacity(envelopes.len());
        let batches = split(envelopes, MAX_BATCH_ENTRIES);
        let batch_count = batches.len();

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let queued_at = Utc::now();
            let entries = match batch_entries(batch, queued_at) {
                Ok(entries) => entries,
                Err(e) => return Err(QueueSubmissionError::new(accepted, e)),
            };

            QueueMetrics::record_batch_size(entries.len());
            let started = Instant::now();
            let result = self.client.submit_message_batch(entries).await;
            QueueMetrics::observe_latency(started.elapsed().as_secs_f64());

            let ack = match result {
                Ok(ack) => ack,
                Err(e) => {
                    QueueMetrics::record_batch(false);
                    tracing::error!(
                        batch_index,
                        batch_count,
                        accepted = accepted.len(),
                        error = %e,
                        "Queue batch submission failed, skipping remaining batches"
                    );
                    return Err(QueueSubmissionError::new(accepted, e));
                }
            };

            // Entry ids are batch positions, so acknowledged ids map back in input order
            let successful: HashSet<&str> = ack.successful.iter().map(String::as_str).collect();
            let before = accepted.len();
            for (position, envelope) in batch.iter().enumerate() {
                if successful.contains(position.to_string().as_str()) {
                    accepted.push(envelope.id());
                }
            }

            let missing = batch.len() - (accepted.len() - before);
            if missing > 0 {
                QueueMetrics::record_batch(false);
                let reason = ack
                    .failed
                    .first()
                    .map(|f| match &f.message {
                        Some(message) => format!("{}: {}", f.code, message),
                        None => f.code.clone(),
                    })
                    .unwrap_or_else(|| "entries missing from acknowledgement".to_string());

                tracing::error!(
                    batch_index,
                    batch_count,
                    failed = missing,
                    accepted = accepted.len(),
                    reason = %reason,
                    "Queue rejected batch entries, skipping remaining batches"
                );
                return Err(QueueSubmissionError::new(
                    accepted,
                    QueueError::PartialBatch {
                        failed: missing,
                        total: batch.len(),
                        reason,
                    },
                ));
            }

            QueueMetrics::record_batch(true);
        }

        tracing::info!(
            action = "notification_batch_queued",
            count = envelopes.len(),
            batches = batch_count,
            "Notification batch queued"
        );

        Ok(accepted)
    }
}

/// Build the queue message for an envelope.
///
/// High priority asks for zero delay explicitly; other priorities leave the
/// queue's default delay in place.
pub fn outbound_message(
    envelope: &NotificationEnvelope,
    queued_at: DateTime<Utc>,
) -> Result<OutboundMessage, QueueError> {
    let body = serde_json::to_string(&envelope.queued_at(queued_at))?;

    Ok(OutboundMessage {
        body,
        attributes: MessageAttributes {
            channel_type: envelope.channel_type(),
            priority: envelope.priority(),
        },
        delay_seconds: match envelope.priority() {
            Priority::High => Some(0),
            Priority::Normal | Priority::Low => None,
        },
    })
}

fn batch_entries(
    batch: &[NotificationEnvelope],
    queued_at: DateTime<Utc>,
) -> Result<Vec<BatchEntry>, QueueError> {
    batch
        .iter()
        .enumerate()
        .map(|(position, envelope)| {
            Ok(BatchEntry {
                id: position.to_string(),
                message: outbound_message(envelope, queued_at)?,
            })
        })
        .collect()
}
