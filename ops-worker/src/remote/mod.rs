//! Remote command gateway
//!
//! Runs the lab station's administrative executable and reads telemetry
//! files on a host through WinRM. The `CommandGateway` trait is the seam the
//! orchestrator and the heartbeat ingestor depend on.

pub mod gateway;
pub mod wsman;

pub use gateway::WinRmGateway;
pub use wsman::{RawCommandOutput, WsmanSession};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Host;
use crate::errors::{ConfigurationError, OpsError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Per-call connection overrides. Unset fields fall back to the host entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionOverrides {
    #[serde(default, alias = "user")]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub use_ssl: Option<bool>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Invokes the host's administrative executable with `command` followed
    /// by `args`. A nonzero exit code is returned, not raised.
    async fn execute(
        &self,
        host: &Host,
        command: &str,
        args: &[String],
        overrides: &SessionOverrides,
    ) -> Result<CommandOutput, OpsError>;

    /// Full UTF-8 contents of a file on the host.
    async fn read_file(&self, host: &Host, path: &str) -> Result<String, OpsError>;
}

/// Override pair first, then the host's pair. Both halves must come from the
/// same source.
pub fn resolve_credentials(
    host: &Host,
    overrides: &SessionOverrides,
) -> Result<(String, String), OpsError> {
    let pick = |user: Option<&String>, pass: Option<&String>| match (user, pass) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => {
            Some((u.trim().to_string(), p.clone()))
        }
        _ => None,
    };

    pick(overrides.username.as_ref(), overrides.password.as_ref())
        .or_else(|| pick(host.winrm_user.as_ref(), host.winrm_pass.as_ref()))
        .ok_or_else(|| {
            OpsError::Configuration(ConfigurationError::MissingCredentials {
                host: host.name.clone(),
            })
        })
}

pub fn resolve_endpoint(host: &Host, overrides: &SessionOverrides) -> String {
    let use_ssl = overrides.use_ssl.unwrap_or(host.winrm_use_ssl);
    let scheme = if use_ssl { "https" } else { "http" };
    let port = overrides.port.unwrap_or(host.winrm_port);
    format!("{}://{}:{}/wsman", scheme, host.address, port)
}

/// Only HTTP Basic is implemented; `plaintext` is accepted as its alias.
pub fn resolve_transport(host: &Host, overrides: &SessionOverrides) -> Result<String, OpsError> {
    let transport = overrides
        .transport
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&host.winrm_transport)
        .to_lowercase();

    match transport.as_str() {
        "basic" | "plaintext" => Ok(transport),
        _ => Err(OpsError::Configuration(
            ConfigurationError::UnsupportedTransport {
                host: host.name.clone(),
                transport,
            },
        )),
    }
}

/// `Get-Content` invocation for a literal Windows path.
pub fn read_file_script(path: &str) -> String {
    format!(
        "Get-Content -LiteralPath '{}' -Raw -Encoding UTF8",
        path.replace('\'', "''")
    )
}
