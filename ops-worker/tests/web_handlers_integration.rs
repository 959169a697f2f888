// Integration tests for web API handlers
mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::fixtures::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use ops_worker::web::{create_router, AppState};

fn router(gateway: ScriptedGateway, probe: ScriptedProbe, db: Option<&TestDatabase>) -> Router {
    let ops = ops_service(
        Arc::new(gateway),
        Arc::new(probe),
        db.map(TestDatabase::database),
    );
    create_router(AppState::new(Arc::new(ops)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_loaded_hosts() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["hosts_loaded"], 2);
    assert_eq!(body["data"]["db"], false);
}

#[tokio::test]
async fn test_host_listing_hides_passwords() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(app, get("/api/hosts")).await;

    assert_eq!(status, StatusCode::OK);
    let hosts = body["data"].as_array().unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0]["name"], LAB1);
    assert_eq!(hosts[0]["winrm_user"], "labadmin");
    assert!(hosts.iter().all(|h| h.get("winrm_pass").is_none()));
}

#[tokio::test]
async fn test_wake_by_host_name() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(2), None);

    let (status, body) = send(app, post("/api/wol", json!({ "host": "LAB1" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["attempts_used"], 2);
    assert_eq!(body["data"]["ping_target"], LAB1_ADDRESS);
}

#[tokio::test]
async fn test_wake_without_mac_is_bad_request() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(app, post("/api/wol", json!({ "host": NO_MAC_HOST }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_remote_command_returns_output() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(
        app,
        post(
            "/api/winrm",
            json!({ "host": "lab1", "command": "status", "args": "--json" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exit_code"], 0);
    assert_eq!(body["data"]["stdout"], "  status done\r\n");
}

#[tokio::test]
async fn test_remote_command_requires_host_and_command() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, _) = send(app, post("/api/winrm", json!({ "host": "lab1" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_host_is_not_found() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(
        app,
        post("/api/winrm", json!({ "host": "lab9", "command": "status" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("lab9"));
}

#[tokio::test]
async fn test_transport_failure_is_server_error() {
    let app = router(
        ScriptedGateway::new().unreachable(),
        ScriptedProbe::reachable_at(1),
        None,
    );

    let (status, _) = send(
        app,
        post("/api/winrm", json!({ "host": "lab1", "command": "status" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_heartbeat_poll_reports_side_channels() {
    let db = TestDatabase::new().await.unwrap();
    let gateway = ScriptedGateway::new()
        .with_file(heartbeat_path(), HEARTBEAT_JSON)
        .with_file(events_path(), EVENTS_WITH_BROKEN_TAIL);
    let app = router(gateway, ScriptedProbe::reachable_at(1), Some(&db));

    let (status, body) = send(
        app,
        post("/api/heartbeat/poll", json!({ "host": "lab1", "includeEvents": "yes" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["host"], LAB1);
    assert_eq!(body["data"]["heartbeat"]["summary"]["ready"], true);
    assert_eq!(body["data"]["events"]["status"], "degraded");
    assert_eq!(body["data"]["persistence"]["status"], "ok");
    assert!(body["data"]["last_event"].is_null());
}

#[tokio::test]
async fn test_heartbeat_history_round_trip() {
    let db = TestDatabase::new().await.unwrap();
    let gateway = ScriptedGateway::new().with_file(heartbeat_path(), HEARTBEAT_JSON);
    let app = router(gateway, ScriptedProbe::reachable_at(1), Some(&db));

    let (status, _) = send(
        app.clone(),
        post("/api/heartbeat/poll", json!({ "host": "lab1", "include_events": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get("/api/hosts/LAB1/heartbeats?limit=5")).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ready"], true);
    assert_eq!(rows[0]["last_power_action_mode"], "reboot");
}

#[tokio::test]
async fn test_history_without_database_is_unavailable() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, _) = send(app.clone(), get("/api/hosts/lab1/heartbeats")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(app, get("/api/reservations/res-1/operations")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_start_reservation_success() {
    let db = TestDatabase::new().await.unwrap();
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), Some(&db));

    let (status, body) = send(
        app.clone(),
        post(
            "/api/reservations/start",
            json!({ "reservationId": "res-1", "host": "lab1", "labId": "lab-a", "guardGrace": 60 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["reservationId"], "res-1");
    let steps = body["data"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["action"], "wake");
    assert_eq!(steps[1]["action"], "prepare");
    assert_eq!(steps[1]["details"]["args"], json!(["--guard-grace=60"]));

    let (status, body) = send(app, get("/api/reservations/res-1/operations")).await;
    assert_eq!(status, StatusCode::OK);
    let ops = body["data"].as_array().unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0]["action"], "wake");
    assert_eq!(ops[0]["response_code"], 200);
    assert_eq!(ops[1]["lab_id"], "lab-a");
}

#[tokio::test]
async fn test_failed_reservation_is_bad_gateway_with_steps() {
    let gateway = ScriptedGateway::new().with_exit_code("release-session", 5);
    let app = router(gateway, ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(
        app,
        post(
            "/api/reservations/end",
            json!({ "reservationId": "res-2", "host": "lab1", "powerAction": { "mode": "shutdown" } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("release failed"));
    let steps = body["data"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["details"]["exitCode"], 5);
}

#[tokio::test]
async fn test_reservation_without_ids_is_bad_request() {
    let app = router(ScriptedGateway::new(), ScriptedProbe::reachable_at(1), None);

    let (status, body) = send(app, post("/api/reservations/start", json!({ "host": "lab1" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("reservationId"));
}
