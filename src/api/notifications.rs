//! Notification submission endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::notification::RawNotificationRequest;
use crate::server::AppState;

use super::extract::ApiJson;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message_id: Uuid,
    /// `queued`, `sent` or `failed`
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkSendRequest {
    #[serde(default)]
    pub notifications: Vec<RawNotificationRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendResponse {
    pub success: bool,
    pub message_ids: Vec<Uuid>,
    pub count: usize,
}

/// POST /api/notifications/send
pub async fn send_notification(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RawNotificationRequest>,
) -> Result<Json<SendResponse>> {
    let receipt = state.dispatcher.dispatch(request).await?;

    Ok(Json(SendResponse {
        success: true,
        message_id: receipt.id(),
        status: receipt.status(),
    }))
}

/// POST /api/notifications/send-bulk
pub async fn send_bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkSendRequest>,
) -> Result<Json<BulkSendResponse>> {
    let receipts = state
        .dispatcher
        .dispatch_batch(request.notifications, state.settings.dispatch.max_bulk_size)
        .await?;

    let message_ids: Vec<Uuid> = receipts.iter().map(|r| r.id()).collect();
    Ok(Json(BulkSendResponse {
        success: true,
        count: message_ids.len(),
        message_ids,
    }))
}
