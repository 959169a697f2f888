// Host directory and telemetry history endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::error;

use super::common::{error_response, persistence_disabled, ApiResponse, ApiResult, LimitQuery};
use crate::config::Host;
use crate::database::HeartbeatRecord;
use crate::web::AppState;

/// Configured hosts with fallbacks applied; passwords are never serialized.
pub async fn list_hosts(State(state): State<AppState>) -> ApiResult<Vec<Host>> {
    Ok(Json(ApiResponse::success(
        state.ops.directory().all_hosts().to_vec(),
    )))
}

/// Stored heartbeats for a host, most recent first
pub async fn get_heartbeat_history(
    Path(host_name): Path<String>,
    Query(query): Query<LimitQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<HeartbeatRecord>> {
    let host = state.ops.host(&host_name).map_err(|e| error_response(&e))?;
    let Some(database) = state.ops.database() else {
        return Err(persistence_disabled());
    };

    match database.get_heartbeat_history(&host.name, query.limit).await {
        Ok(records) => Ok(Json(ApiResponse::success(records))),
        Err(e) => {
            error!("Failed to load heartbeat history for {}: {}", host.name, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}
