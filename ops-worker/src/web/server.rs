use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(state: AppState) -> Result<()> {
    let app = create_router(state.clone());
    let config = state.ops.config();
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // === HOST DIRECTORY ROUTES ===
        .route("/api/hosts", get(handlers::list_hosts))
        .route(
            "/api/hosts/{host_name}/heartbeats",
            get(handlers::get_heartbeat_history),
        )
        // === DIRECT OPERATION ROUTES ===
        .route("/api/wol", post(handlers::wake_host))
        .route("/api/winrm", post(handlers::run_remote_command))
        .route("/api/heartbeat/poll", post(handlers::poll_heartbeat))
        // === RESERVATION ROUTES ===
        .route("/api/reservations/start", post(handlers::start_reservation))
        .route("/api/reservations/end", post(handlers::end_reservation))
        .route(
            "/api/reservations/{reservation_id}/operations",
            get(handlers::get_reservation_operations),
        )
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
