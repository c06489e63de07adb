//! AWS SQS queue client.

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{MessageAttributeValue, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client as SqsClient;

use super::client::{
    BatchAck, BatchEntry, BatchEntryFailure, MessageAck, MessageAttributes, OutboundMessage,
    QueueClient, QueueError,
};

/// [`QueueClient`] backed by an SQS standard queue.
///
/// The SDK client is created once at startup and shared; it is safe to use
/// from concurrent tasks.
pub struct SqsQueueClient {
    client: SqsClient,
    queue_url: String,
}

impl SqsQueueClient {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Load AWS credentials from the environment and build a client for `region`
    pub async fn from_env(region: &str, queue_url: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::new(SqsClient::new(&config), queue_url)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

fn string_attribute(value: &str) -> Result<MessageAttributeValue, QueueError> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| QueueError::Serialization(e.to_string()))
}

fn attribute_values(
    attributes: &MessageAttributes,
) -> Result<Vec<(&'static str, MessageAttributeValue)>, QueueError> {
    attributes
        .pairs()
        .into_iter()
        .map(|(name, value)| Ok((name, string_attribute(value)?)))
        .collect()
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn submit_message(&self, message: OutboundMessage) -> Result<MessageAck, QueueError> {
        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body)
            .set_delay_seconds(message.delay_seconds);

        for (name, value) in attribute_values(&message.attributes)? {
            request = request.message_attributes(name, value);
        }

        let output = request
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;

        Ok(MessageAck {
            message_id: output.message_id().map(str::to_string),
        })
    }

    async fn submit_message_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchAck, QueueError> {
        let mut request = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url);

        for entry in entries {
            let mut builder = SendMessageBatchRequestEntry::builder()
                .id(entry.id)
                .message_body(entry.message.body)
                .set_delay_seconds(entry.message.delay_seconds);

            for (name, value) in attribute_values(&entry.message.attributes)? {
                builder = builder.message_attributes(name, value);
            }

            let batch_entry = builder
                .build()
                .map_err(|e| QueueError::Serialization(e.to_string()))?;
            request = request.entries(batch_entry);
        }

        let output = request
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;

        Ok(BatchAck {
            successful: output
                .successful()
                .iter()
                .map(|entry| entry.id().to_string())
                .collect(),
            failed: output
                .failed()
                .iter()
                .map(|entry| BatchEntryFailure {
                    entry_id: entry.id().to_string(),
                    code: entry.code().to_string(),
                    message: entry.message().map(str::to_string),
                })
                .collect(),
        })
    }

    fn backend(&self) -> &'static str {
        "sqs"
    }
}
