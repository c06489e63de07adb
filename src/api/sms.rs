//! Direct SMS endpoint for service-to-service calls.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::channels::SmsMessage;
use crate::error::Result;
use crate::notification::required;
use crate::server::AppState;

use super::extract::ApiJson;

#[derive(Debug, Default, Deserialize)]
pub struct SmsRequest {
    pub to: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/notifications/sms and POST /notifications/sms
///
/// Bypasses the queue; a provider failure is reported as 502.
pub async fn send_sms(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SmsRequest>,
) -> Result<Json<SuccessResponse>> {
    let to = required(request.to, "to")?;
    let body = required(request.message, "message")?;

    state.channels.sms.send_sms(&SmsMessage::new(to, body)).await?;

    Ok(Json(SuccessResponse { success: true }))
}
