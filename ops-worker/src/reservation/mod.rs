//! Reservation lifecycle orchestration
//!
//! A reservation start wakes the host and prepares a session; a reservation
//! end releases the session and optionally powers the host down. Each step
//! produces a `StepResult` and one audit row.

pub mod orchestrator;
pub mod request;

pub use orchestrator::ReservationOrchestrator;
pub use request::{EndReservation, PowerAction, StartReservation, WakeOptions};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
}

impl StepStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeDetails {
    pub mac: String,
    pub ping_target: String,
    pub attempts_requested: u32,
    pub attempts_used: u32,
    pub wait_seconds: f64,
    pub port: u16,
    pub broadcast: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDetails {
    /// `None` when the command never ran
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub args: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepDetails {
    Wake(WakeDetails),
    Command(CommandDetails),
    Empty {},
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub action: String,
    pub status: StepStatus,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub details: StepDetails,
    /// Recorded in the audit trail only
    #[serde(skip)]
    pub response_code: Option<i64>,
}

impl StepResult {
    /// A step rejected before any network activity.
    pub fn rejected(action: &str, message: &str) -> Self {
        Self {
            action: action.to_string(),
            status: StepStatus::Failed,
            success: false,
            message: message.to_string(),
            duration_ms: None,
            details: StepDetails::Empty {},
            response_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationOutcome {
    pub success: bool,
    pub reservation_id: String,
    pub host: String,
    pub lab_id: Option<String>,
    pub steps: Vec<StepResult>,
}
