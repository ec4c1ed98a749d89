//! Mapping of platform errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mdp_api::ErrorResponse;
use tracing::error;

use crate::errors::PlatformError;

impl PlatformError {
    /// HTTP status a handler failing with this error answers with
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlatformError::NotFound(_) => StatusCode::NOT_FOUND,
            PlatformError::AlreadyExists(_) => StatusCode::CONFLICT,
            PlatformError::ValidationError(_) | PlatformError::JsonError(_) => StatusCode::BAD_REQUEST,
            PlatformError::SignatureInvalid(_) => StatusCode::UNAUTHORIZED,
            PlatformError::NoJobAvailable => StatusCode::NO_CONTENT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
