// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::OpsError;

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Payload that is returned whether or not the operation succeeded.
    pub fn outcome(success: bool, data: T, message: Option<String>) -> Self {
        Self {
            success,
            data: Some(data),
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Unknown host → 404, other configuration problems → 400, everything else → 500.
pub fn status_for(error: &OpsError) -> StatusCode {
    if error.is_unknown_host() {
        StatusCode::NOT_FOUND
    } else if error.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn error_response(error: &OpsError) -> ApiError {
    (status_for(error), Json(ApiResponse::error(error.to_string())))
}

pub fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(message.to_string())),
    )
}

pub fn persistence_disabled() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::error(
            "No database configured (set database_path in main.toml)".to_string(),
        )),
    )
}

// Query parameters
#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
