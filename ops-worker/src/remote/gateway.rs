use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::wsman::{RawCommandOutput, WsmanSession};
use super::{
    read_file_script, resolve_credentials, resolve_endpoint, resolve_transport, CommandGateway,
    CommandOutput, SessionOverrides,
};
use crate::config::{Defaults, Host};
use crate::constants::winrm::OPERATION_TIMEOUT_SECONDS;
use crate::errors::OpsError;

/// `CommandGateway` over WinRM with HTTP Basic authentication.
#[derive(Clone)]
pub struct WinRmGateway {
    client: Client,
    call_timeout: Duration,
}

impl WinRmGateway {
    pub fn new(defaults: &Defaults) -> Result<Self> {
        Self::with_timeout(Duration::from_secs(defaults.remote_timeout_seconds.max(1)))
    }

    pub fn with_timeout(call_timeout: Duration) -> Result<Self> {
        // A single Receive may block server-side for the advertised operation timeout
        let request_timeout = Duration::from_secs(OPERATION_TIMEOUT_SECONDS + 10).min(call_timeout);
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10).min(call_timeout))
            .build()
            .map_err(|e| anyhow!("Failed to create WinRM HTTP client: {}", e))?;

        Ok(Self {
            client,
            call_timeout,
        })
    }

    fn session(&self, host: &Host, overrides: &SessionOverrides) -> Result<WsmanSession, OpsError> {
        resolve_transport(host, overrides)?;
        let (username, password) = resolve_credentials(host, overrides)?;
        let endpoint = resolve_endpoint(host, overrides);
        Ok(WsmanSession::new(self.client.clone(), endpoint, username, password))
    }

    async fn bounded<F>(&self, host: &Host, call: F) -> Result<RawCommandOutput, OpsError>
    where
        F: std::future::Future<Output = Result<RawCommandOutput>>,
    {
        match timeout(self.call_timeout, call).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(OpsError::RemoteExecution {
                host: host.name.clone(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(OpsError::RemoteExecution {
                host: host.name.clone(),
                reason: format!("timed out after {}s", self.call_timeout.as_secs()),
            }),
        }
    }
}

#[async_trait]
impl CommandGateway for WinRmGateway {
    #[instrument(skip(self, host, args, overrides), fields(host = %host.name))]
    async fn execute(
        &self,
        host: &Host,
        command: &str,
        args: &[String],
        overrides: &SessionOverrides,
    ) -> Result<CommandOutput, OpsError> {
        let session = self.session(host, overrides)?;
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(command.to_string());
        full_args.extend(args.iter().cloned());

        info!(
            "Running {} {} on {} via {}",
            host.labstation_exe,
            full_args.join(" "),
            host.name,
            session.endpoint()
        );

        let started = Instant::now();
        let raw = self
            .bounded(host, session.run_cmd(&host.labstation_exe, &full_args))
            .await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if raw.status_code != 0 {
            warn!(
                "{} {} on {} exited with {}",
                host.labstation_exe, command, host.name, raw.status_code
            );
        }

        Ok(CommandOutput {
            exit_code: raw.status_code,
            stdout: String::from_utf8_lossy(&raw.std_out).into_owned(),
            stderr: String::from_utf8_lossy(&raw.std_err).into_owned(),
            duration_ms,
        })
    }

    #[instrument(skip(self, host), fields(host = %host.name))]
    async fn read_file(&self, host: &Host, path: &str) -> Result<String, OpsError> {
        let session = self.session(host, &SessionOverrides::default())?;
        debug!("Reading {} from {}", path, host.name);

        let raw = self
            .bounded(host, session.run_ps(&read_file_script(path)))
            .await?;

        if raw.status_code != 0 {
            return Err(OpsError::RemoteRead {
                host: host.name.clone(),
                path: path.to_string(),
                exit_code: raw.status_code,
                stderr: String::from_utf8_lossy(&raw.std_err).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&raw.std_out).into_owned())
    }
}
