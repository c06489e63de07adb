//! Envelope construction and request validation.
//!
//! Inbound requests arrive as [`RawNotificationRequest`] with every field
//! optional, so that a missing or malformed field surfaces as a
//! [`ValidationError`] instead of a deserialization failure.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::types::{ChannelType, NotificationEnvelope, Priority};

/// Errors raised when a request cannot be turned into an envelope.
///
/// Never retried; surfaced to the caller as a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("type must be email, sms, or push (got '{0}')")]
    UnknownChannel(String),

    #[error("priority must be high, normal, or low (got '{0}')")]
    InvalidPriority(String),

    #[error("notifications array is required")]
    EmptyBatch,

    #[error("Maximum {max} notifications per batch (got {size})")]
    BatchTooLarge { size: usize, max: usize },

    #[error("notification {index}: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Notification request as received from a caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotificationRequest {
    /// Channel tag: "email", "sms" or "push"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Email address, phone number or device token
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// "high", "normal" or "low"
    pub priority: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Push-only key/value payload
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Builder for notification envelopes.
///
/// Assigns a fresh id on [`build`](Self::build); each built envelope gets
/// its own id even when the inputs are identical.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    channel_type: ChannelType,
    recipient: String,
    body: String,
    subject: Option<String>,
    data: Option<serde_json::Map<String, serde_json::Value>>,
    priority: Priority,
    user_id: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl NotificationBuilder {
    /// Create a new builder for the given channel, recipient and body
    pub fn new(
        channel_type: ChannelType,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            channel_type,
            recipient: recipient.into(),
            body: body.into(),
            subject: None,
            data: None,
            priority: Priority::default(),
            user_id: None,
            metadata: None,
        }
    }

    /// Set the subject (email subject, push title)
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the push data payload
    pub fn data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the envelope, rejecting an empty recipient or body
    pub fn build(self) -> Result<NotificationEnvelope, ValidationError> {
        if self.recipient.is_empty() {
            return Err(ValidationError::MissingField("to"));
        }
        if self.body.is_empty() {
            return Err(ValidationError::MissingField("body"));
        }

        Ok(NotificationEnvelope {
            id: Uuid::new_v4(),
            channel_type: self.channel_type,
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            data: self.data,
            priority: self.priority,
            user_id: self.user_id,
            metadata: self.metadata,
        })
    }
}

impl TryFrom<RawNotificationRequest> for NotificationEnvelope {
    type Error = ValidationError;

    fn try_from(request: RawNotificationRequest) -> Result<Self, Self::Error> {
        let kind = required(request.kind, "type")?;
        let to = required(request.to, "to")?;
        let body = required(request.body, "body")?;

        let channel_type = kind
            .parse::<ChannelType>()
            .map_err(ValidationError::UnknownChannel)?;

        let priority = match request.priority {
            Some(p) => p.parse::<Priority>().map_err(ValidationError::InvalidPriority)?,
            None => Priority::default(),
        };

        let mut builder = NotificationBuilder::new(channel_type, to, body).priority(priority);

        if let Some(subject) = request.subject {
            builder = builder.subject(subject);
        }
        if let Some(data) = request.data {
            builder = builder.data(data);
        }
        if let Some(user_id) = request.user_id {
            builder = builder.user_id(user_id);
        }
        if let Some(metadata) = request.metadata {
            builder = builder.metadata(metadata);
        }

        builder.build()
    }
}

/// Validate a whole bulk request before anything is dispatched.
///
/// The batch must be non-empty and at most `max_batch_size` long; the first
/// invalid item is reported with its index.
pub fn build_envelopes(
    requests: Vec<RawNotificationRequest>,
    max_batch_size: usize,
) -> Result<Vec<NotificationEnvelope>, ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if requests.len() > max_batch_size {
        return Err(ValidationError::BatchTooLarge {
            size: requests.len(),
            max: max_batch_size,
        });
    }

    requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| {
            NotificationEnvelope::try_from(request).map_err(|e| ValidationError::InvalidItem {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

// Empty strings count as missing
pub(crate) fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: &str, to: &str, body: &str) -> RawNotificationRequest {
        RawNotificationRequest {
            kind: Some(kind.to_string()),
            to: Some(to.to_string()),
            body: Some(body.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_email_request() {
        let envelope = NotificationEnvelope::try_from(raw("email", "a@b.com", "hi")).unwrap();

        assert_eq!(envelope.channel_type(), ChannelType::Email);
        assert_eq!(envelope.recipient(), "a@b.com");
        assert_eq!(envelope.body(), "hi");
        assert_eq!(envelope.subject(), None);
        assert_eq!(envelope.priority(), Priority::Normal);
        assert!(!envelope.id().is_nil());
    }

    #[test]
    fn test_ids_are_unique_for_identical_input() {
        let a = NotificationEnvelope::try_from(raw("sms", "+15550100", "hi")).unwrap();
        let b = NotificationEnvelope::try_from(raw("sms", "+15550100", "hi")).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_missing_required_fields() {
        let mut request = raw("email", "a@b.com", "hi");
        request.kind = None;
        assert_eq!(
            NotificationEnvelope::try_from(request),
            Err(ValidationError::MissingField("type"))
        );

        let mut request = raw("email", "a@b.com", "hi");
        request.to = None;
        assert_eq!(
            NotificationEnvelope::try_from(request),
            Err(ValidationError::MissingField("to"))
        );

        let request = raw("email", "a@b.com", "");
        assert_eq!(
            NotificationEnvelope::try_from(request),
            Err(ValidationError::MissingField("body"))
        );
    }

    #[test]
    fn test_unknown_channel() {
        for kind in ["fax", "EMAIL", "webhook"] {
            assert_eq!(
                NotificationEnvelope::try_from(raw(kind, "x", "y")),
                Err(ValidationError::UnknownChannel(kind.to_string()))
            );
        }
    }

    #[test]
    fn test_invalid_priority() {
        let mut request = raw("push", "token", "hi");
        request.priority = Some("urgent".to_string());
        assert_eq!(
            NotificationEnvelope::try_from(request),
            Err(ValidationError::InvalidPriority("urgent".to_string()))
        );
    }

    #[test]
    fn test_passthrough_fields_are_kept() {
        let request: RawNotificationRequest = serde_json::from_value(json!({
            "type": "push",
            "to": "device-token",
            "subject": "Hello",
            "body": "World",
            "priority": "high",
            "userId": "u-1",
            "metadata": {"campaign": "spring"},
            "data": {"screen": "ride"}
        }))
        .unwrap();

        let envelope = NotificationEnvelope::try_from(request).unwrap();
        assert_eq!(envelope.priority(), Priority::High);
        assert_eq!(envelope.user_id(), Some("u-1"));
        assert_eq!(envelope.metadata(), Some(&json!({"campaign": "spring"})));
        assert_eq!(envelope.data().unwrap()["screen"], json!("ride"));
    }

    #[test]
    fn test_build_envelopes_admission_control() {
        assert_eq!(build_envelopes(vec![], 100), Err(ValidationError::EmptyBatch));

        let requests = vec![raw("sms", "+1", "x"); 3];
        assert_eq!(
            build_envelopes(requests, 2),
            Err(ValidationError::BatchTooLarge { size: 3, max: 2 })
        );
    }

    #[test]
    fn test_build_envelopes_reports_item_index() {
        let requests = vec![raw("sms", "+1", "x"), raw("pager", "+1", "x")];
        let err = build_envelopes(requests, 100).unwrap_err();

        assert_eq!(
            err,
            ValidationError::InvalidItem {
                index: 1,
                source: Box::new(ValidationError::UnknownChannel("pager".to_string())),
            }
        );
        assert_eq!(
            err.to_string(),
            "notification 1: type must be email, sms, or push (got 'pager')"
        );
    }

    #[test]
    fn test_build_envelopes_preserves_order() {
        let requests = vec![raw("sms", "+1", "a"), raw("sms", "+2", "b"), raw("sms", "+3", "c")];
        let envelopes = build_envelopes(requests, 100).unwrap();
        let bodies: Vec<_> = envelopes.iter().map(|e| e.body()).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }
}
