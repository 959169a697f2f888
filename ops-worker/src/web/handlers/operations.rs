// Direct host operations: wake, remote command, heartbeat poll

use axum::{extract::State, response::Json};
use serde::Deserialize;
use tracing::{error, info};

use super::common::{bad_request, error_response, ApiResponse, ApiResult};
use crate::remote::{CommandOutput, SessionOverrides};
use crate::reservation::request::flexible;
use crate::services::{HeartbeatReport, WakeCommand, WakeReport};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct RemoteCommandRequest {
    #[serde(default, alias = "hostName")]
    pub host: String,
    #[serde(default)]
    pub command: String,
    #[serde(default, deserialize_with = "flexible::args")]
    pub args: Option<Vec<String>>,
    #[serde(flatten)]
    pub overrides: SessionOverrides,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatPollRequest {
    #[serde(default, alias = "hostName")]
    pub host: String,
    #[serde(
        default = "include_events_default",
        alias = "includeEvents",
        deserialize_with = "flexible::flag"
    )]
    pub include_events: bool,
}

fn include_events_default() -> bool {
    true
}

/// Send a magic packet and wait for the host to answer ping
pub async fn wake_host(
    State(state): State<AppState>,
    Json(request): Json<WakeCommand>,
) -> ApiResult<WakeReport> {
    match state.ops.wake(&request).await {
        Ok(report) => {
            info!(
                "Wake of {} finished: reachable={} after {} attempts",
                report.ping_target, report.success, report.attempts_used
            );
            Ok(Json(ApiResponse::success(report)))
        }
        Err(e) => {
            error!("Wake failed: {}", e);
            Err(error_response(&e))
        }
    }
}

/// Run the lab station executable on a host
pub async fn run_remote_command(
    State(state): State<AppState>,
    Json(request): Json<RemoteCommandRequest>,
) -> ApiResult<CommandOutput> {
    if request.host.trim().is_empty() || request.command.trim().is_empty() {
        return Err(bad_request("host and command are required"));
    }

    let args = request.args.unwrap_or_default();
    match state
        .ops
        .execute_command(&request.host, &request.command, &args, &request.overrides)
        .await
    {
        Ok(output) => Ok(Json(ApiResponse::success(output))),
        Err(e) => {
            error!("Remote command {} on {} failed: {}", request.command, request.host, e);
            Err(error_response(&e))
        }
    }
}

/// Fetch, normalize and store a heartbeat now
pub async fn poll_heartbeat(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatPollRequest>,
) -> ApiResult<HeartbeatReport> {
    if request.host.trim().is_empty() {
        return Err(bad_request("host is required"));
    }

    match state
        .ops
        .poll_heartbeat(&request.host, request.include_events)
        .await
    {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => {
            error!("Heartbeat poll for {} failed: {}", request.host, e);
            Err(error_response(&e))
        }
    }
}
