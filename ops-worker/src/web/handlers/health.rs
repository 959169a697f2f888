// Liveness endpoint

use axum::{extract::State, response::Json};

use super::common::ApiResponse;
use crate::web::{AppState, ServiceHealth};

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<ServiceHealth>> {
    let ops = &state.ops;
    Json(ApiResponse::success(ServiceHealth {
        status: "ok".to_string(),
        hosts_loaded: ops.directory().len(),
        db: ops.database().is_some(),
        poll_enabled: ops.config().poll_enabled,
    }))
}
