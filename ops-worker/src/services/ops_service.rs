//! Entry points for every lab station operation.
//!
//! Resolves host names through the directory and hands off to the prober,
//! the command gateway, the heartbeat ingestor or the reservation
//! orchestrator. The HTTP layer and the poller both go through here.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::{Config, Host, HostDirectory};
use crate::database::Database;
use crate::errors::{ConfigurationError, OpsError};
use crate::remote::{CommandGateway, CommandOutput, SessionOverrides};
use crate::reservation::{EndReservation, ReservationOrchestrator, ReservationOutcome, StartReservation};
use crate::telemetry::{HeartbeatIngestor, HeartbeatPoll};
use crate::wake::{self, ReachabilityProbe, WakeRequest};

/// Direct wake request. Every field falls back to the named host, if any.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WakeCommand {
    #[serde(default, alias = "hostName")]
    pub host: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default, alias = "pingTarget")]
    pub ping_target: Option<String>,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default, alias = "pingTimeout")]
    pub ping_timeout: Option<f64>,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WakeReport {
    pub success: bool,
    pub attempts_used: u32,
    pub duration_ms: u64,
    pub ping_target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatReport {
    #[serde(flatten)]
    pub poll: HeartbeatPoll,
    pub duration_ms: u64,
}

pub struct OpsService {
    config: Arc<Config>,
    directory: Arc<HostDirectory>,
    database: Option<Arc<Database>>,
    prober: Arc<dyn ReachabilityProbe>,
    gateway: Arc<dyn CommandGateway>,
    ingestor: Arc<HeartbeatIngestor>,
    orchestrator: ReservationOrchestrator,
}

impl OpsService {
    pub fn new(
        config: Arc<Config>,
        directory: Arc<HostDirectory>,
        database: Option<Arc<Database>>,
        prober: Arc<dyn ReachabilityProbe>,
        gateway: Arc<dyn CommandGateway>,
    ) -> Self {
        let ingestor = Arc::new(HeartbeatIngestor::new(gateway.clone(), database.clone()));
        let orchestrator = ReservationOrchestrator::new(
            prober.clone(),
            gateway.clone(),
            database.clone(),
            config.defaults.clone(),
        );

        Self {
            config,
            directory,
            database,
            prober,
            gateway,
            ingestor,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn directory(&self) -> &Arc<HostDirectory> {
        &self.directory
    }

    pub fn database(&self) -> Option<&Arc<Database>> {
        self.database.as_ref()
    }

    /// Shared with the background poller.
    pub fn ingestor(&self) -> Arc<HeartbeatIngestor> {
        self.ingestor.clone()
    }

    pub fn host(&self, name: &str) -> Result<&Host, OpsError> {
        self.directory
            .lookup(name)
            .ok_or_else(|| OpsError::unknown_host(name))
    }

    #[instrument(skip(self, command), fields(host = ?command.host))]
    pub async fn wake(&self, command: &WakeCommand) -> Result<WakeReport, OpsError> {
        let host = match command.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(name) => Some(self.host(name)?),
            None => None,
        };

        let mac = pick(command.mac.as_deref(), host.and_then(|h| h.mac.as_deref()))
            .ok_or_else(|| missing_wake_target("mac"))?;
        let ping_target = pick(
            command.ping_target.as_deref(),
            host.and_then(|h| h.ping_target.as_deref().or(Some(h.address.as_str()))),
        )
        .ok_or_else(|| missing_wake_target("ping_target"))?;

        let defaults = &self.config.defaults;
        let wait_seconds = command.ping_timeout.unwrap_or(defaults.wake_wait_seconds);
        if let Err(e) = wake::wait_duration(wait_seconds) {
            return Err(OpsError::Configuration(ConfigurationError::InvalidValue {
                field: "ping_timeout".to_string(),
                reason: e.to_string(),
            }));
        }

        let request = WakeRequest {
            mac,
            broadcast: pick(command.broadcast.as_deref(), host.and_then(|h| h.broadcast.as_deref())),
            port: command
                .port
                .or(host.map(|h| h.wol_port))
                .unwrap_or(defaults.wol_port),
            ping_target: ping_target.clone(),
            attempts: command
                .attempts
                .or(host.map(|h| h.wake_attempts))
                .unwrap_or(defaults.wake_attempts),
            wait_seconds,
        };

        let started = Instant::now();
        let outcome = self
            .prober
            .wake_and_wait(&request)
            .await
            .map_err(|e| OpsError::RemoteExecution {
                host: ping_target.clone(),
                reason: e.to_string(),
            })?;

        Ok(WakeReport {
            success: outcome.reached,
            attempts_used: outcome.attempts_used,
            duration_ms: started.elapsed().as_millis() as u64,
            ping_target,
        })
    }

    #[instrument(skip(self, args, overrides))]
    pub async fn execute_command(
        &self,
        host_name: &str,
        command: &str,
        args: &[String],
        overrides: &SessionOverrides,
    ) -> Result<CommandOutput, OpsError> {
        if command.trim().is_empty() {
            return Err(required("command", "host and command are required"));
        }
        let host = self.host(host_name)?;
        self.gateway.execute(host, command, args, overrides).await
    }

    pub async fn poll_heartbeat(
        &self,
        host_name: &str,
        include_events: bool,
    ) -> Result<HeartbeatReport, OpsError> {
        let host = self.host(host_name)?;
        let started = Instant::now();
        let poll = self.ingestor.poll(host, include_events).await?;

        Ok(HeartbeatReport {
            poll,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    pub async fn start_reservation(
        &self,
        request: &StartReservation,
    ) -> Result<ReservationOutcome, OpsError> {
        validate_reservation(&request.reservation_id, &request.host)?;
        let host = self.host(&request.host)?;
        info!("Starting reservation {} on {}", request.reservation_id, host.name);
        Ok(self.orchestrator.start(host, request).await)
    }

    pub async fn end_reservation(
        &self,
        request: &EndReservation,
    ) -> Result<ReservationOutcome, OpsError> {
        validate_reservation(&request.reservation_id, &request.host)?;
        let host = self.host(&request.host)?;
        info!("Ending reservation {} on {}", request.reservation_id, host.name);
        Ok(self.orchestrator.end(host, request).await)
    }
}

fn pick(first: Option<&str>, fallback: Option<&str>) -> Option<String> {
    [first, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn missing_wake_target(field: &str) -> OpsError {
    OpsError::Configuration(ConfigurationError::MissingWakeTarget {
        field: field.to_string(),
    })
}

fn required(field: &str, reason: &str) -> OpsError {
    OpsError::Configuration(ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    })
}

fn validate_reservation(reservation_id: &str, host: &str) -> Result<(), OpsError> {
    if reservation_id.trim().is_empty() || host.trim().is_empty() {
        return Err(required("reservationId", "reservationId and host are required"));
    }
    Ok(())
}
