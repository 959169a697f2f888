pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use serde::Serialize;
use std::sync::Arc;

use crate::services::OpsService;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub ops: Arc<OpsService>,
}

impl AppState {
    pub fn new(ops: Arc<OpsService>) -> Self {
        Self { ops }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    pub hosts_loaded: usize,
    pub db: bool,
    pub poll_enabled: bool,
}
