//! Database record types (entities).
//!
//! This module contains all the record structs used by the database layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Host telemetry entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub mac: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub id: i64,
    pub host_id: i64,
    pub timestamp_utc: DateTime<Utc>,
    pub ready: Option<bool>,
    pub local_mode: Option<bool>,
    pub local_session: Option<bool>,
    pub last_forced_logoff_ts: Option<DateTime<Utc>>,
    pub last_forced_logoff_user: Option<String>,
    pub last_power_action_ts: Option<DateTime<Utc>>,
    pub last_power_action_mode: Option<String>,
    pub raw_json: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEventRecord {
    pub id: i64,
    pub host_id: i64,
    pub kind: String,
    pub timestamp_utc: DateTime<Utc>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Reservation audit entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationOperation {
    pub id: String,
    pub reservation_id: String,
    pub lab_id: Option<String>,
    pub host: String,
    pub action: String,
    pub status: String,
    pub success: bool,
    pub response_code: Option<i64>,
    pub duration_ms: Option<i64>,
    /// JSON-encoded step details
    pub payload: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}
