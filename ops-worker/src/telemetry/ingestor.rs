//! Heartbeat ingestion
//!
//! Fetches the heartbeat file (and optionally the tail of the session-guard
//! log) from a host, normalizes it and records it. Only the heartbeat read is
//! allowed to fail the poll; the event tail and the store write are side
//! channels reported as degraded.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::snapshot::{HeartbeatFields, HeartbeatSnapshot, RawPayload, SessionGuardEvent};
use crate::config::Host;
use crate::database::Database;
use crate::errors::OpsError;
use crate::remote::CommandGateway;

/// Outcome of a best-effort part of a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SideChannel {
    /// Not requested or not configured
    Skipped,
    Ok,
    /// Requested but there was nothing to read
    Empty,
    Degraded { reason: String },
}

impl SideChannel {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SideChannel::Degraded { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatPoll {
    pub host: String,
    pub heartbeat: Value,
    pub summary: HeartbeatFields,
    pub last_event: Option<Value>,
    pub events: SideChannel,
    pub persistence: SideChannel,
}

pub struct HeartbeatIngestor {
    gateway: Arc<dyn CommandGateway>,
    database: Option<Arc<Database>>,
}

impl HeartbeatIngestor {
    pub fn new(gateway: Arc<dyn CommandGateway>, database: Option<Arc<Database>>) -> Self {
        Self { gateway, database }
    }

    #[instrument(skip(self, host), fields(host = %host.name))]
    pub async fn poll(&self, host: &Host, include_events: bool) -> Result<HeartbeatPoll, OpsError> {
        let text = self.gateway.read_file(host, &host.heartbeat_path).await?;
        let raw = RawPayload::parse(&text).map_err(|e| OpsError::TelemetryParse {
            host: host.name.clone(),
            reason: format!("heartbeat is not valid JSON: {}", e),
        })?;
        let snapshot = HeartbeatSnapshot::normalize(raw, Utc::now());

        let (event, events) = if include_events {
            self.read_last_event(host, &snapshot).await
        } else {
            (None, SideChannel::Skipped)
        };

        let persistence = match &self.database {
            None => SideChannel::Skipped,
            Some(database) => match database.record_heartbeat(host, &snapshot, event.as_ref()).await {
                Ok(host_id) => {
                    debug!("Heartbeat for {} stored under host row {}", host.name, host_id);
                    SideChannel::Ok
                }
                Err(e) => {
                    let err = OpsError::persistence(&e);
                    error!("Failed to persist heartbeat for {}: {}", host.name, err);
                    SideChannel::Degraded {
                        reason: err.to_string(),
                    }
                }
            },
        };

        info!(
            "Heartbeat from {} at {} (ready: {:?})",
            host.name, snapshot.fields.timestamp, snapshot.fields.ready
        );

        Ok(HeartbeatPoll {
            host: host.name.clone(),
            summary: snapshot.fields.clone(),
            heartbeat: snapshot.raw.value,
            last_event: event.map(|e| e.raw.value),
            events,
            persistence,
        })
    }

    async fn read_last_event(
        &self,
        host: &Host,
        snapshot: &HeartbeatSnapshot,
    ) -> (Option<SessionGuardEvent>, SideChannel) {
        let text = match self.gateway.read_file(host, &host.events_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read session-guard events from {}: {}", host.name, e);
                return (
                    None,
                    SideChannel::Degraded {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let Some(line) = last_non_empty_line(&text) else {
            return (None, SideChannel::Empty);
        };

        match RawPayload::parse(line) {
            Ok(raw) => (
                Some(SessionGuardEvent::normalize(raw, snapshot.fields.timestamp)),
                SideChannel::Ok,
            ),
            Err(e) => {
                warn!("Last session-guard event from {} is not valid JSON: {}", host.name, e);
                (
                    None,
                    SideChannel::Degraded {
                        reason: format!("last event is not valid JSON: {}", e),
                    },
                )
            }
        }
    }
}

fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .find(|line| !line.is_empty())
}
