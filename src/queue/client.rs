//! Durable queue client abstraction.
//!
//! This module defines the transport seam between the [`QueueSubmitter`](super::QueueSubmitter)
//! and a concrete queue (AWS SQS in production, in-memory for tests and local runs).

use async_trait::async_trait;
use thiserror::Error;

use crate::notification::{ChannelType, Priority};

/// Errors reported by a queue transport.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The transport call itself failed (network, auth, throttling, ...)
    #[error("Queue transport error: {0}")]
    Transport(String),

    /// The transport accepted the call but rejected some batch entries
    #[error("Queue rejected {failed} of {total} batch entries: {reason}")]
    PartialBatch {
        failed: usize,
        total: usize,
        reason: String,
    },

    /// Message body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client could not be built from configuration
    #[error("Queue configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Serialization(e.to_string())
    }
}

/// Routing attributes attached to every queued message so that consumers can
/// filter without deserializing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageAttributes {
    pub channel_type: ChannelType,
    pub priority: Priority,
}

impl MessageAttributes {
    /// Attribute name/value pairs as written to the queue
    pub fn pairs(&self) -> [(&'static str, &'static str); 2] {
        [
            ("type", self.channel_type.as_str()),
            ("priority", self.priority.as_str()),
        ]
    }
}

/// A single message ready for the queue transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub body: String,
    pub attributes: MessageAttributes,
    /// Explicit delivery delay; `None` keeps the queue default
    pub delay_seconds: Option<i32>,
}

/// One entry of a physical batch submission
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// Entry id, unique within the batch
    pub id: String,
    pub message: OutboundMessage,
}

/// Acknowledgement for a single submitted message
#[derive(Debug, Clone, Default)]
pub struct MessageAck {
    /// Identifier assigned by the queue, if it returns one
    pub message_id: Option<String>,
}

/// A batch entry the queue refused
#[derive(Debug, Clone)]
pub struct BatchEntryFailure {
    pub entry_id: String,
    pub code: String,
    pub message: Option<String>,
}

/// Outcome of one physical batch submission
#[derive(Debug, Clone, Default)]
pub struct BatchAck {
    /// Entry ids the queue accepted
    pub successful: Vec<String>,
    pub failed: Vec<BatchEntryFailure>,
}

/// Durable at-least-once queue transport.
///
/// Implementations are long-lived and shared across concurrent dispatches.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Submit one message
    async fn submit_message(&self, message: OutboundMessage) -> Result<MessageAck, QueueError>;

    /// Submit a batch of messages in a single transport call
    async fn submit_message_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchAck, QueueError>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_pairs() {
        let attributes = MessageAttributes {
            channel_type: ChannelType::Sms,
            priority: Priority::Low,
        };
        assert_eq!(attributes.pairs(), [("type", "sms"), ("priority", "low")]);
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::PartialBatch {
            failed: 2,
            total: 10,
            reason: "InternalError".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Queue rejected 2 of 10 batch entries: InternalError"
        );
    }
}
