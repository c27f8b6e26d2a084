// ABOUTME: HTTP error body and status mapping for the deployment API.
// ABOUTME: Saga error kinds map to 400/404/409/502/500.

use crate::saga::{SagaError, SagaErrorKind};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    deployment_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            deployment_id: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(kind: SagaErrorKind) -> StatusCode {
    match kind {
        SagaErrorKind::Validation => StatusCode::BAD_REQUEST,
        SagaErrorKind::NotFound => StatusCode::NOT_FOUND,
        SagaErrorKind::InvalidState | SagaErrorKind::Conflict => StatusCode::CONFLICT,
        SagaErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
        SagaErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        let status = status_for(err.kind());
        if status.is_server_error() {
            tracing::error!(error = %err, "deployment request failed");
        } else {
            tracing::debug!(error = %err, "deployment request rejected");
        }

        Self {
            status,
            deployment_id: err.deployment_id().map(ToString::to_string),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            timestamp: Utc::now(),
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.message,
            deployment_id: self.deployment_id,
        };
        (self.status, Json(body)).into_response()
    }
}
