//! Firebase Cloud Messaging (HTTP v1) push adapter.
//!
//! Authenticates with a service account: a signed RS256 assertion is exchanged
//! at the OAuth token endpoint for a short-lived access token, which is cached
//! until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::notification::{redact, ChannelType};

use super::{ensure_success, ChannelError, PushChannel, PushMessage};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Service account credentials used to mint access tokens
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct FcmPushChannel {
    http: reqwest::Client,
    endpoint: String,
    account: ServiceAccount,
    token: Mutex<Option<CachedToken>>,
}

impl FcmPushChannel {
    pub fn new(
        http: reqwest::Client,
        project_id: String,
        account: ServiceAccount,
        api_base: &str,
    ) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/v1/projects/{}/messages:send",
                api_base.trim_end_matches('/'),
                project_id
            ),
            account,
            token: Mutex::new(None),
        }
    }

    fn credentials_error(reason: impl ToString) -> ChannelError {
        ChannelError::Credentials {
            channel: ChannelType::Push,
            reason: reason.to_string(),
        }
    }

    fn transport_error(source: reqwest::Error) -> ChannelError {
        ChannelError::Transport {
            channel: ChannelType::Push,
            source,
        }
    }

    fn assertion(&self) -> Result<String, ChannelError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(Self::credentials_error)?;
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(Self::credentials_error)
    }

    async fn access_token(&self) -> Result<String, ChannelError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(Self::transport_error)?;

        let response = ensure_success(ChannelType::Push, response).await?;
        let token: TokenResponse = response.json().await.map_err(Self::transport_error)?;

        tracing::debug!(expires_in = token.expires_in, "Refreshed FCM access token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }
}

/// FCM only accepts string values in the data payload
fn stringify_data(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), Value::String(text))
        })
        .collect()
}

/// Build the `messages:send` request body for a push message
pub fn fcm_message(message: &PushMessage) -> Value {
    let mut aps = Map::new();
    aps.insert(
        "sound".to_string(),
        json!(message.sound.as_deref().unwrap_or("default")),
    );
    if let Some(badge) = message.badge {
        aps.insert("badge".to_string(), json!(badge));
    }

    let mut body = json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "apns": {
                "payload": { "aps": aps }
            },
            "android": {
                "priority": "high",
                "notification": {
                    "sound": message.sound.as_deref().unwrap_or("default"),
                }
            }
        }
    });

    if let Some(data) = &message.data {
        body["message"]["data"] = Value::Object(stringify_data(data));
    }

    body
}

#[async_trait]
impl PushChannel for FcmPushChannel {
    #[tracing::instrument(skip(self, message), fields(token = %redact(&message.token, 10)))]
    async fn send_push(&self, message: &PushMessage) -> Result<(), ChannelError> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .json(&fcm_message(message))
            .send()
            .await
            .map_err(Self::transport_error)?;

        ensure_success(ChannelType::Push, response).await?;

        tracing::info!(action = "push_sent", title = %message.title, "Push notification sent");
        Ok(())
    }
}

/// Outcome counts of a multi-token push send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushBulkSummary {
    pub success: usize,
    pub failure: usize,
}

/// Send the same push content to every token concurrently.
///
/// Individual failures are counted, never propagated.
pub async fn send_push_bulk(
    channel: &dyn PushChannel,
    tokens: &[String],
    title: &str,
    body: &str,
    data: Option<&Map<String, Value>>,
) -> PushBulkSummary {
    let messages: Vec<PushMessage> = tokens
        .iter()
        .map(|token| PushMessage {
            data: data.cloned(),
            ..PushMessage::new(token.as_str(), title, body)
        })
        .collect();

    let results = join_all(messages.iter().map(|m| channel.send_push(m))).await;

    let mut summary = PushBulkSummary::default();
    for result in results {
        match result {
            Ok(()) => summary.success += 1,
            Err(e) => {
                tracing::debug!(error = %e, "Bulk push entry failed");
                summary.failure += 1;
            }
        }
    }

    tracing::info!(
        action = "push_bulk_sent",
        success = summary.success,
        failure = summary.failure,
        "Bulk push completed"
    );
    summary
}
