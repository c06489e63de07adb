//! Direct push endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::channels::{send_push_bulk, PushBulkSummary, PushMessage};
use crate::error::Result;
use crate::notification::{required, ValidationError};
use crate::server::AppState;

use super::extract::ApiJson;
use super::sms::SuccessResponse;

#[derive(Debug, Default, Deserialize)]
pub struct PushRequest {
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub badge: Option<u32>,
    pub sound: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PushBulkRequest {
    #[serde(default)]
    pub tokens: Vec<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Map<String, Value>>,
}

/// POST /api/push/send
///
/// Provider failures are reported as `{"success": false}`.
pub async fn send_push(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PushRequest>,
) -> Result<Json<SuccessResponse>> {
    let message = PushMessage {
        data: request.data,
        badge: request.badge,
        sound: request.sound,
        ..PushMessage::new(
            required(request.token, "token")?,
            required(request.title, "title")?,
            required(request.body, "body")?,
        )
    };

    let success = match state.channels.push.send_push(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Push send failed");
            false
        }
    };

    Ok(Json(SuccessResponse { success }))
}

/// POST /api/push/send-bulk
pub async fn send_bulk_push(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PushBulkRequest>,
) -> Result<Json<PushBulkSummary>> {
    if request.tokens.is_empty() {
        return Err(ValidationError::MissingField("tokens").into());
    }
    let title = required(request.title, "title")?;
    let body = required(request.body, "body")?;

    let summary = send_push_bulk(
        state.channels.push.as_ref(),
        &request.tokens,
        &title,
        &body,
        request.data.as_ref(),
    )
    .await;

    Ok(Json(summary))
}
