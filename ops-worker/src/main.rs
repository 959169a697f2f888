use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ops_worker::config::{ConfigManager, HostDirectory};
use ops_worker::database::Database;
use ops_worker::remote::WinRmGateway;
use ops_worker::scheduler::HeartbeatPoller;
use ops_worker::services::OpsService;
use ops_worker::wake::NetworkProber;
use ops_worker::web::{start_web_server, AppState};

const CONFIG_DIR_ENV: &str = "OPS_CONFIG_DIR";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("ops_worker=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Lab Station ops worker");

    // Load configuration
    let config_dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
    let config_manager = ConfigManager::new(config_dir).await?;
    let config = config_manager.get_current_config();

    let directory = Arc::new(HostDirectory::from_config(&config));
    info!("Host directory loaded: {} hosts", directory.len());
    if directory.is_empty() {
        warn!("No hosts configured; every host operation will be rejected");
    }

    // Initialize database
    let database = match config.database_path.as_deref() {
        Some(path) => {
            let database = Arc::new(Database::new(path).await?);
            info!("Database initialized");
            Some(database)
        }
        None => {
            warn!("No database_path configured; audit rows and heartbeats will not be stored");
            None
        }
    };

    let gateway = Arc::new(WinRmGateway::new(&config.defaults)?);
    let prober = Arc::new(NetworkProber::new());

    let ops = Arc::new(OpsService::new(
        config.clone(),
        directory.clone(),
        database,
        prober,
        gateway,
    ));
    info!("Ops service initialized");

    if config.poll_enabled {
        let poller = Arc::new(HeartbeatPoller::new(
            directory,
            ops.ingestor(),
            Duration::from_secs(config.poll_interval_seconds),
        ));
        poller.spawn();
    } else {
        info!("Scheduled heartbeat polling disabled");
    }

    // Start web server
    start_web_server(AppState::new(ops)).await?;

    Ok(())
}
