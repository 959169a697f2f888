// File: ops-worker/src/config/manager.rs
use super::{Config, HostsFile, SecretsLoader};
use anyhow::{anyhow, Result};
use glob::glob;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

const MAIN_CONFIG: &str = "main.toml";
const SECRETS_CONFIG: &str = "secrets.toml";

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/{}", config_dir, MAIN_CONFIG);
        let main_config_content = fs::read_to_string(&main_config_path).await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        if config.poll_interval_seconds == 0 {
            return Err(anyhow!("poll_interval_seconds must be greater than zero"));
        }

        // Host files: every other *.toml, in file name order
        let pattern = format!("{}/*.toml", config_dir);
        let mut host_files = Vec::new();
        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path.file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == MAIN_CONFIG || filename == SECRETS_CONFIG {
                continue;
            }
            host_files.push(path);
        }
        host_files.sort();

        let mut all_hosts = Vec::new();
        for path in host_files {
            debug!("Loading host file: {}", path.display());

            let content = fs::read_to_string(&path).await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let hosts_file: HostsFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            all_hosts.extend(hosts_file.hosts);
        }

        let secrets = SecretsLoader::load(&Path::new(config_dir).join(SECRETS_CONFIG))?;
        secrets.apply(&mut all_hosts);

        config.hosts = all_hosts;

        info!(
            "Loaded {} host entries, polling {} (every {}s), database {}",
            config.hosts.len(),
            if config.poll_enabled { "enabled" } else { "disabled" },
            config.poll_interval_seconds,
            config.database_path.as_deref().unwrap_or("disabled")
        );

        Ok(config)
    }
}
