// File: ops-worker/src/config/secrets.rs
//! Secrets loader for WinRM credentials.
//!
//! Credentials are kept in a separate TOML file (config/secrets.toml) that
//! should be excluded from version control. Host files may omit `winrm_user`
//! and `winrm_pass`; they are resolved from here by host name at load time.
//!
//! Example secrets.toml:
//! ```toml
//! [credentials.lab1]
//! username = "labadmin"
//! password = "secret"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::HostEntry;

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

/// Structure matching the secrets.toml file format
#[derive(Debug, Deserialize, Default)]
pub struct SecretsFile {
    #[serde(default)]
    pub credentials: HashMap<String, CredentialPair>,
}

/// Loader for secrets from the secrets.toml file
pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Load secrets from the specified file path.
    /// Returns an empty loader if the file doesn't exist.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        if !secrets_path.exists() {
            warn!(
                "Secrets file not found at {:?}, WinRM credentials must come from host files",
                secrets_path
            );
            return Ok(Self {
                secrets: SecretsFile::default(),
            });
        }

        let content = std::fs::read_to_string(secrets_path)
            .with_context(|| format!("Failed to read secrets file: {:?}", secrets_path))?;

        let secrets: SecretsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {:?}", secrets_path))?;

        info!(
            "Loaded credentials for {} hosts from {:?}",
            secrets.credentials.len(),
            secrets_path
        );

        Ok(Self { secrets })
    }

    /// Credentials for a host, matched case-insensitively.
    pub fn get_host_credentials(&self, host_name: &str) -> Option<&CredentialPair> {
        self.secrets
            .credentials
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(host_name))
            .map(|(_, pair)| pair)
    }

    /// Fill in credentials for entries that carry none of their own.
    pub fn apply(&self, entries: &mut [HostEntry]) {
        for entry in entries.iter_mut() {
            if entry.winrm_user.is_some() && entry.winrm_pass.is_some() {
                continue;
            }
            let Some(name) = entry.name.as_deref() else {
                continue;
            };
            if let Some(pair) = self.get_host_credentials(name) {
                if entry.winrm_user.is_none() {
                    entry.winrm_user = Some(pair.username.clone());
                }
                if entry.winrm_pass.is_none() {
                    entry.winrm_pass = Some(pair.password.clone());
                }
            }
        }
    }
}
