//! Common test data and constants

use std::sync::Arc;

use ops_worker::config::{Config, Defaults, HostDirectory, HostEntry};
use ops_worker::constants::agent;
use ops_worker::database::Database;
use ops_worker::remote::CommandGateway;
use ops_worker::services::OpsService;
use ops_worker::wake::ReachabilityProbe;

pub const LAB1: &str = "lab1";
pub const LAB1_MAC: &str = "AA:BB:CC:DD:EE:FF";
pub const LAB1_ADDRESS: &str = "10.0.0.11";
pub const NO_MAC_HOST: &str = "lab2";

/// Heartbeat as the agent writes it
pub const HEARTBEAT_JSON: &str = r#"{"timestamp":"2026-03-02T08:15:00Z","summary":{"ready":true,"issues":[]},"status":{"localModeEnabled":false,"localSessionActive":true},"operations":{"lastForcedLogoff":{"timestamp":"2026-03-01T22:00:00Z","user":"student"},"lastPowerAction":{"timestamp":"2026-03-01T23:00:00+01:00","mode":"reboot"}}}"#;

pub const EVENTS_JSONL: &str = "{\"timestamp\":\"2026-03-02T07:00:00Z\",\"event\":\"guard-armed\"}\n{\"timestamp\":\"2026-03-02T08:10:00Z\",\"event\":\"logoff\",\"user\":\"student\"}\n";

pub const EVENTS_WITH_BROKEN_TAIL: &str =
    "{\"timestamp\":\"2026-03-02T07:00:00Z\",\"event\":\"guard-armed\"}\n{\"timestamp\": \"2026-03-02T08:1\n";

pub fn heartbeat_path() -> &'static str {
    agent::HEARTBEAT_PATH
}

pub fn events_path() -> &'static str {
    agent::EVENTS_PATH
}

/// Defaults with no waiting between wake probes
pub fn fast_defaults() -> Defaults {
    Defaults {
        wake_wait_seconds: 0.0,
        ..Defaults::default()
    }
}

pub fn lab1_entry() -> HostEntry {
    HostEntry {
        name: Some("LAB1".to_string()),
        address: Some(LAB1_ADDRESS.to_string()),
        mac: Some(LAB1_MAC.to_string()),
        broadcast: Some("127.0.0.1".to_string()),
        winrm_user: Some("labadmin".to_string()),
        winrm_pass: Some("secret".to_string()),
        ..Default::default()
    }
}

/// Host with an address but no MAC
pub fn no_mac_entry() -> HostEntry {
    HostEntry {
        name: Some(NO_MAC_HOST.to_string()),
        address: Some("10.0.0.12".to_string()),
        winrm_user: Some("labadmin".to_string()),
        winrm_pass: Some("secret".to_string()),
        ..Default::default()
    }
}

pub fn test_config() -> Arc<Config> {
    let mut config: Config = toml::from_str("").expect("empty config parses");
    config.defaults = fast_defaults();
    config.hosts = vec![lab1_entry(), no_mac_entry()];
    Arc::new(config)
}

pub fn test_directory(config: &Config) -> Arc<HostDirectory> {
    Arc::new(HostDirectory::from_config(config))
}

pub fn ops_service(
    gateway: Arc<dyn CommandGateway>,
    prober: Arc<dyn ReachabilityProbe>,
    database: Option<Arc<Database>>,
) -> OpsService {
    let config = test_config();
    let directory = test_directory(&config);
    OpsService::new(config, directory, database, prober, gateway)
}
