//! Host directory: the static name → connection attributes map.
//!
//! Built once from the loaded configuration and shared read-only for the
//! lifetime of the process.

use serde::Serialize;
use tracing::{debug, warn};

use super::{Config, Defaults, HostEntry};

/// A lab station host with every fallback already applied.
#[derive(Debug, Clone, Serialize)]
pub struct Host {
    /// Lowercase-normalized, unique
    pub name: String,
    pub address: String,
    pub mac: Option<String>,
    pub broadcast: Option<String>,
    pub ping_target: Option<String>,
    pub wol_port: u16,
    pub wake_attempts: u32,
    pub labstation_exe: String,
    pub winrm_user: Option<String>,
    #[serde(skip_serializing)]
    pub winrm_pass: Option<String>,
    pub winrm_port: u16,
    pub winrm_transport: String,
    pub winrm_use_ssl: bool,
    pub heartbeat_path: String,
    pub events_path: String,
}

impl Host {
    /// Returns `None` for entries missing a name or an address.
    pub fn from_entry(entry: &HostEntry, defaults: &Defaults) -> Option<Self> {
        let name = non_empty(entry.name.as_deref())?.to_lowercase();
        let address = non_empty(entry.address.as_deref())?.to_string();

        Some(Self {
            name,
            address,
            mac: non_empty(entry.mac.as_deref()).map(str::to_string),
            broadcast: non_empty(entry.broadcast.as_deref()).map(str::to_string),
            ping_target: non_empty(entry.ping_target.as_deref()).map(str::to_string),
            wol_port: entry.wol_port.unwrap_or(defaults.wol_port),
            wake_attempts: entry.wake_attempts.unwrap_or(defaults.wake_attempts),
            labstation_exe: entry
                .labstation_exe
                .clone()
                .unwrap_or_else(|| defaults.labstation_exe.clone()),
            winrm_user: non_empty(entry.winrm_user.as_deref()).map(str::to_string),
            winrm_pass: non_empty(entry.winrm_pass.as_deref()).map(str::to_string),
            winrm_port: entry.winrm_port.unwrap_or(defaults.winrm_port),
            winrm_transport: entry
                .winrm_transport
                .clone()
                .unwrap_or_else(|| defaults.winrm_transport.clone()),
            winrm_use_ssl: entry.winrm_use_ssl.unwrap_or(defaults.winrm_use_ssl),
            heartbeat_path: entry
                .heartbeat_path
                .clone()
                .unwrap_or_else(|| defaults.heartbeat_path.clone()),
            events_path: entry
                .events_path
                .clone()
                .unwrap_or_else(|| defaults.events_path.clone()),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct HostDirectory {
    hosts: Vec<Host>,
}

impl HostDirectory {
    pub fn from_config(config: &Config) -> Self {
        Self::from_entries(&config.hosts, &config.defaults)
    }

    pub fn from_entries(entries: &[HostEntry], defaults: &Defaults) -> Self {
        let mut hosts: Vec<Host> = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(host) = Host::from_entry(entry, defaults) else {
                debug!("Skipping host entry without name or address: {:?}", entry.name);
                continue;
            };

            if let Some(existing) = hosts.iter_mut().find(|h| h.name == host.name) {
                warn!("Duplicate host entry '{}', later entry wins", host.name);
                *existing = host;
            } else {
                hosts.push(host);
            }
        }

        Self { hosts }
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&Host> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.hosts.iter().find(|h| h.name == key)
    }

    /// All hosts in load order.
    pub fn all_hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
