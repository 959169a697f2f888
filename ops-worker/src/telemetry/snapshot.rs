//! Heartbeat and session-guard payload normalization
//!
//! The agent writes free-form JSON. Only a handful of fields are lifted into
//! typed columns; the verbatim text is always kept next to them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Telemetry body exactly as fetched, plus its parsed form.
#[derive(Debug, Clone, Serialize)]
pub struct RawPayload {
    pub text: String,
    pub value: Value,
}

impl RawPayload {
    /// Parses `text` after stripping a UTF-8 byte order mark and surrounding
    /// whitespace. The stored text is what was parsed.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let text = text.trim_start_matches('\u{feff}').trim();
        let value = serde_json::from_str(text)?;
        Ok(Self {
            text: text.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcedLogoff {
    pub timestamp: Option<DateTime<Utc>>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerActionRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub mode: Option<String>,
}

/// Normalized view of one heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatFields {
    pub timestamp: DateTime<Utc>,
    /// False when the payload carried no usable timestamp and ingestion time was used
    pub timestamp_reported: bool,
    pub ready: Option<bool>,
    pub local_mode: Option<bool>,
    pub local_session: Option<bool>,
    pub last_forced_logoff: ForcedLogoff,
    pub last_power_action: PowerActionRecord,
}

impl HeartbeatFields {
    /// Pure function of the payload; `ingested_at` is used only when the
    /// payload has no parsable `timestamp`.
    pub fn extract(value: &Value, ingested_at: DateTime<Utc>) -> Self {
        let reported = parse_utc_timestamp(value.get("timestamp"));

        let forced = value.pointer("/operations/lastForcedLogoff");
        let power = value.pointer("/operations/lastPowerAction");

        Self {
            timestamp: reported.unwrap_or(ingested_at),
            timestamp_reported: reported.is_some(),
            ready: bool_at(value, "/summary/ready"),
            local_mode: bool_at(value, "/status/localModeEnabled"),
            local_session: bool_at(value, "/status/localSessionActive"),
            last_forced_logoff: ForcedLogoff {
                timestamp: parse_utc_timestamp(forced.and_then(|f| f.get("timestamp"))),
                user: string_at(forced, "user"),
            },
            last_power_action: PowerActionRecord {
                timestamp: parse_utc_timestamp(power.and_then(|p| p.get("timestamp"))),
                mode: string_at(power, "mode"),
            },
        }
    }
}

/// Known fields plus the payload they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSnapshot {
    pub fields: HeartbeatFields,
    #[serde(skip)]
    pub raw: RawPayload,
}

impl HeartbeatSnapshot {
    pub fn normalize(raw: RawPayload, ingested_at: DateTime<Utc>) -> Self {
        let fields = HeartbeatFields::extract(&raw.value, ingested_at);
        Self { fields, raw }
    }
}

/// Last entry of the session-guard event log.
#[derive(Debug, Clone)]
pub struct SessionGuardEvent {
    pub timestamp: DateTime<Utc>,
    pub raw: RawPayload,
}

impl SessionGuardEvent {
    /// Uses the event's own timestamp, falling back to the heartbeat's.
    pub fn normalize(raw: RawPayload, heartbeat_timestamp: DateTime<Utc>) -> Self {
        let timestamp =
            parse_utc_timestamp(raw.value.get("timestamp")).unwrap_or(heartbeat_timestamp);
        Self { timestamp, raw }
    }
}

/// ISO-8601 timestamp to UTC. Accepts offsets, a trailing `Z`, and naive
/// values (taken as UTC). Anything else yields `None`.
pub fn parse_utc_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn bool_at(value: &Value, pointer: &str) -> Option<bool> {
    value.pointer(pointer).and_then(Value::as_bool)
}

fn string_at(value: Option<&Value>, key: &str) -> Option<String> {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
