// Reservation lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, warn};

use super::common::{error_response, persistence_disabled, ApiError, ApiResponse, ApiResult};
use crate::database::ReservationOperation;
use crate::errors::OpsError;
use crate::reservation::{EndReservation, ReservationOutcome, StartReservation};
use crate::web::AppState;

type OutcomeResponse = Result<(StatusCode, Json<ApiResponse<ReservationOutcome>>), ApiError>;

/// Wake the host and prepare the session
pub async fn start_reservation(
    State(state): State<AppState>,
    Json(request): Json<StartReservation>,
) -> OutcomeResponse {
    respond(state.ops.start_reservation(&request).await)
}

/// Release the session and run the optional power action
pub async fn end_reservation(
    State(state): State<AppState>,
    Json(request): Json<EndReservation>,
) -> OutcomeResponse {
    respond(state.ops.end_reservation(&request).await)
}

/// Audit trail for one reservation, in recording order
pub async fn get_reservation_operations(
    Path(reservation_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<ReservationOperation>> {
    let Some(database) = state.ops.database() else {
        return Err(persistence_disabled());
    };

    match database.get_reservation_operations(&reservation_id).await {
        Ok(operations) => Ok(Json(ApiResponse::success(operations))),
        Err(e) => {
            error!("Failed to load operations for {}: {}", reservation_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

/// The full step list is returned either way; a failed workflow answers 502.
fn respond(result: Result<ReservationOutcome, OpsError>) -> OutcomeResponse {
    let outcome = result.map_err(|e| error_response(&e))?;

    if outcome.success {
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::outcome(true, outcome, None)),
        ));
    }

    let message = outcome
        .steps
        .iter()
        .find(|step| !step.success)
        .map(|step| format!("{} failed: {}", step.action, step.message));
    warn!(
        "Reservation {} on {} did not complete: {}",
        outcome.reservation_id,
        outcome.host,
        message.as_deref().unwrap_or("unknown step")
    );
    Ok((
        StatusCode::BAD_GATEWAY,
        Json(ApiResponse::outcome(false, outcome, message)),
    ))
}
