use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::channels::ChannelError;
use crate::notification::{DispatchError, ValidationError};
use crate::queue::QueueSubmissionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Queue error: {0}")]
    QueueSubmission(#[from] QueueSubmissionError),

    #[error("Delivery error: {0}")]
    ChannelDelivery(#[from] ChannelError),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Malformed JSON bodies are validation failures; oversized ones keep 413
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::Validation(ValidationError::InvalidBody(rejection.body_text()))
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(e) => AppError::Validation(e),
            DispatchError::QueueSubmission(e) => AppError::QueueSubmission(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: String,
    message: String,
    /// Ids the queue accepted before a bulk submission failed
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted_ids: Option<Vec<Uuid>>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn masked(detail: String, generic: &str) -> String {
    if is_production() {
        generic.to_string()
    } else {
        detail
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let log_message = self.to_string();
        let mut accepted_ids = None;

        let (status, code, client_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                masked(e.to_string(), "Configuration error"),
            ),
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::QueueSubmission(e) => {
                let message = masked(e.to_string(), "Notification queue unavailable");
                if !e.accepted.is_empty() {
                    accepted_ids = Some(e.accepted);
                }
                (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_UNAVAILABLE", message)
            }
            AppError::ChannelDelivery(e) => (
                StatusCode::BAD_GATEWAY,
                "DELIVERY_FAILED",
                masked(e.to_string(), "Failed to deliver notification"),
            ),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                masked(e, "Internal server error"),
            ),
        };

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
                accepted_ids,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::ChannelType;
    use crate::queue::QueueError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::Validation(ValidationError::MissingField("to")),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::QueueSubmission(QueueSubmissionError {
                    accepted: vec![],
                    source: QueueError::Transport("down".to_string()),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::ChannelDelivery(ChannelError::NotConfigured(ChannelType::Sms)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::PayloadTooLarge("length limit exceeded".to_string()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (
                AppError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_dispatch_error_conversion() {
        let err: AppError = DispatchError::Validation(ValidationError::EmptyBatch).into();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyBatch)));
    }
}
