//! HTTP request handlers

pub mod build_jobs;
pub mod github;
pub mod projects;
pub mod services;
pub mod state;

use axum::{body::Bytes, response::IntoResponse, Json};
use mdp_api::HealthResponse;
use serde::de::DeserializeOwned;

use crate::errors::PlatformError;
use crate::utils::version_info;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Decode a JSON request body. An empty body decodes to the default value so
/// the handler's own field validation reports what is missing.
pub(crate) fn decode<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, PlatformError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| PlatformError::ValidationError(format!("invalid json: {}", e)))
}

pub(crate) fn require(value: &str, message: &str) -> Result<(), PlatformError> {
    if value.trim().is_empty() {
        return Err(PlatformError::ValidationError(message.to_string()));
    }
    Ok(())
}

pub(crate) fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.trim().to_string()
    }
}
