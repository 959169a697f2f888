// File: ops-worker/src/config/mod.rs
pub mod directory;
pub mod manager;
pub mod secrets;

use serde::{Deserialize, Serialize};

use crate::constants::{agent, polling, wake, winrm};

pub use directory::{Host, HostDirectory};
pub use manager::ConfigManager;
pub use secrets::SecretsLoader;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_host")]
    pub host: String,
    #[serde(default = "default_bind_port")]
    pub port: u16,
    /// SQLite file for audit and telemetry; no persistence when unset
    pub database_path: Option<String>,
    #[serde(default)]
    pub poll_enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub defaults: Defaults,
    // Populated from the host files next to main.toml
    #[serde(skip)]
    pub hosts: Vec<HostEntry>,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8081
}

fn default_poll_interval() -> u64 {
    polling::INTERVAL_SECONDS
}

/// Fleet-wide fallbacks applied to every host entry that leaves a field unset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub labstation_exe: String,
    pub winrm_port: u16,
    pub winrm_transport: String,
    pub winrm_use_ssl: bool,
    pub wol_port: u16,
    pub wake_attempts: u32,
    pub wake_wait_seconds: f64,
    pub guard_grace_seconds: u32,
    pub remote_timeout_seconds: u64,
    pub heartbeat_path: String,
    pub events_path: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            labstation_exe: agent::LABSTATION_EXE.to_string(),
            winrm_port: winrm::HTTP_PORT,
            winrm_transport: winrm::TRANSPORT.to_string(),
            winrm_use_ssl: false,
            wol_port: wake::WOL_PORT,
            wake_attempts: wake::ATTEMPTS,
            wake_wait_seconds: wake::WAIT_SECONDS,
            guard_grace_seconds: agent::GUARD_GRACE_SECONDS,
            remote_timeout_seconds: winrm::CALL_TIMEOUT.as_secs(),
            heartbeat_path: agent::HEARTBEAT_PATH.to_string(),
            events_path: agent::EVENTS_PATH.to_string(),
        }
    }
}

/// Host entry as written in a host file. Every field is optional here;
/// entries without a name or address are dropped when the directory is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostEntry {
    pub name: Option<String>,
    pub address: Option<String>,
    pub mac: Option<String>,
    pub broadcast: Option<String>,
    pub ping_target: Option<String>,
    pub wol_port: Option<u16>,
    pub wake_attempts: Option<u32>,
    pub labstation_exe: Option<String>,
    pub winrm_user: Option<String>,
    pub winrm_pass: Option<String>,
    pub winrm_port: Option<u16>,
    pub winrm_transport: Option<String>,
    pub winrm_use_ssl: Option<bool>,
    pub heartbeat_path: Option<String>,
    pub events_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostsFile {
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}
