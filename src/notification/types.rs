use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel a notification is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Sms,
    Push,
}

impl ChannelType {
    pub const ALL: [ChannelType; 3] = [ChannelType::Email, ChannelType::Sms, ChannelType::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Sms => "sms",
            ChannelType::Push => "push",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ChannelType::Email),
            "sms" => Ok(ChannelType::Sms),
            "push" => Ok(ChannelType::Push),
            other => Err(other.to_string()),
        }
    }
}

/// Priority levels for notifications.
///
/// Only affects queued delivery: high priority messages ask the queue for
/// zero delivery delay, everything else uses the queue default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority, can be delayed
    Low,
    /// Normal priority (default)
    #[default]
    Normal,
    /// High priority, should be delivered promptly
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(other.to_string()),
        }
    }
}

/// Normalized notification ready for queueing or direct delivery.
///
/// Built once per request by [`NotificationBuilder`](super::NotificationBuilder)
/// and never mutated afterwards. Fields are private so the `id` and the
/// non-empty `recipient`/`body` guarantees cannot be broken after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    pub(super) id: Uuid,
    #[serde(rename = "type")]
    pub(super) channel_type: ChannelType,
    #[serde(rename = "to")]
    pub(super) recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) subject: Option<String>,
    pub(super) body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) data: Option<serde_json::Map<String, serde_json::Value>>,
    pub(super) priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) metadata: Option<serde_json::Value>,
}

impl NotificationEnvelope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn data(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.data.as_ref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    /// Recipient shortened for log output (email addresses and phone numbers
    /// keep 5 characters, device tokens keep 10).
    pub fn redacted_recipient(&self) -> String {
        let keep = match self.channel_type {
            ChannelType::Push => 10,
            ChannelType::Email | ChannelType::Sms => 5,
        };
        redact(&self.recipient, keep)
    }

    /// Wire view of this envelope stamped with the submission time.
    pub fn queued_at(&self, queued_at: DateTime<Utc>) -> QueuedNotification<'_> {
        QueuedNotification {
            envelope: self,
            queued_at,
        }
    }
}

/// Message body written to the durable queue: the envelope plus `queuedAt`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedNotification<'a> {
    #[serde(flatten)]
    pub envelope: &'a NotificationEnvelope,
    pub queued_at: DateTime<Utc>,
}

/// Keep the first `keep` characters of a destination and elide the rest
pub fn redact(value: &str, keep: usize) -> String {
    let prefix: String = value.chars().take(keep).collect();
    format!("{}...", prefix)
}
