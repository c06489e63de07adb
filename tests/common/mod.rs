//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use notification_dispatcher::channels::{
    ChannelAdapters, ChannelError, EmailChannel, EmailMessage, PushChannel, PushMessage,
    SmsChannel, SmsMessage,
};
use notification_dispatcher::config::Settings;
use notification_dispatcher::notification::{ChannelType, DispatchMode, RawNotificationRequest};
use notification_dispatcher::queue::{MemoryQueueClient, QueueSubmitter};
use notification_dispatcher::server::AppState;

/// Channel fake that records every message and fails for listed recipients
#[derive(Default)]
pub struct RecordingChannels {
    pub emails: Mutex<Vec<EmailMessage>>,
    pub sms: Mutex<Vec<SmsMessage>>,
    pub pushes: Mutex<Vec<PushMessage>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingChannels {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().push(recipient.to_string());
    }

    pub fn adapters(self: &Arc<Self>) -> ChannelAdapters {
        ChannelAdapters {
            email: self.clone(),
            sms: self.clone(),
            push: self.clone(),
        }
    }

    fn outcome(&self, channel: ChannelType, recipient: &str) -> Result<(), ChannelError> {
        if self.failing.lock().unwrap().iter().any(|r| r == recipient) {
            return Err(ChannelError::Rejected {
                channel,
                status: 400,
                body: "invalid recipient".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EmailChannel for RecordingChannels {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        self.emails.lock().unwrap().push(message.clone());
        self.outcome(ChannelType::Email, &message.to)
    }
}

#[async_trait]
impl SmsChannel for RecordingChannels {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), ChannelError> {
        self.sms.lock().unwrap().push(message.clone());
        self.outcome(ChannelType::Sms, &message.to)
    }
}

#[async_trait]
impl PushChannel for RecordingChannels {
    async fn send_push(&self, message: &PushMessage) -> Result<(), ChannelError> {
        self.pushes.lock().unwrap().push(message.clone());
        self.outcome(ChannelType::Push, &message.token)
    }
}

pub fn email(to: &str, body: &str) -> RawNotificationRequest {
    serde_json::from_value(json!({ "type": "email", "to": to, "body": body })).unwrap()
}

pub fn sms(to: &str, body: &str) -> RawNotificationRequest {
    serde_json::from_value(json!({ "type": "sms", "to": to, "body": body })).unwrap()
}

/// State wired to an in-memory queue
pub fn queued_state(
    settings: Settings,
    channels: &Arc<RecordingChannels>,
) -> (AppState, Arc<MemoryQueueClient>) {
    let queue = Arc::new(MemoryQueueClient::new());
    let mode = DispatchMode::Queued(QueueSubmitter::new(queue.clone()));
    (AppState::new(settings, mode, channels.adapters()), queue)
}

/// State that delivers inline through the recording channels
pub fn direct_state(settings: Settings, channels: &Arc<RecordingChannels>) -> AppState {
    let mode = DispatchMode::Direct(channels.adapters());
    AppState::new(settings, mode, channels.adapters())
}
