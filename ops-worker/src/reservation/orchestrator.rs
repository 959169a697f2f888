use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::request::{EndReservation, StartReservation, WakeOptions};
use super::{
    CommandDetails, ReservationOutcome, StepDetails, StepResult, StepStatus, WakeDetails,
};
use crate::config::{Defaults, Host};
use crate::constants::{agent, wake};
use crate::database::{Database, ReservationOperation};
use crate::errors::OpsError;
use crate::remote::{CommandGateway, SessionOverrides};
use crate::wake::{wait_duration, ReachabilityProbe, WakeRequest};

/// Identifies the reservation a step belongs to.
struct StepContext<'a> {
    host: &'a Host,
    reservation_id: &'a str,
    lab_id: Option<&'a str>,
}

pub struct ReservationOrchestrator {
    prober: Arc<dyn ReachabilityProbe>,
    gateway: Arc<dyn CommandGateway>,
    database: Option<Arc<Database>>,
    defaults: Defaults,
}

impl ReservationOrchestrator {
    pub fn new(
        prober: Arc<dyn ReachabilityProbe>,
        gateway: Arc<dyn CommandGateway>,
        database: Option<Arc<Database>>,
        defaults: Defaults,
    ) -> Self {
        Self {
            prober,
            gateway,
            database,
            defaults,
        }
    }

    /// Wake, then prepare. A failed wake skips prepare.
    #[instrument(skip(self, host, request), fields(host = %host.name, reservation = %request.reservation_id))]
    pub async fn start(&self, host: &Host, request: &StartReservation) -> ReservationOutcome {
        let ctx = StepContext {
            host,
            reservation_id: &request.reservation_id,
            lab_id: request.lab_id.as_deref(),
        };
        let mut steps = Vec::new();
        let mut success = true;

        if request.wake {
            let options = request.wake_options.clone().unwrap_or_default();
            let step = self.wake_step(&ctx, &options).await;
            success &= step.success;
            steps.push(step);
        }

        if success && request.prepare {
            let guard_grace = request
                .guard_grace
                .unwrap_or(self.defaults.guard_grace_seconds);
            let args = request
                .prepare_args
                .clone()
                .unwrap_or_else(|| vec![format!("--guard-grace={}", guard_grace)]);
            let step = self
                .command_step(&ctx, "prepare", agent::PREPARE_COMMAND, args)
                .await;
            success &= step.success;
            steps.push(step);
        }

        info!(
            "Reservation {} start on {}: {}",
            request.reservation_id,
            host.name,
            if success { "ok" } else { "failed" }
        );
        outcome(&ctx, success, steps)
    }

    /// Release, then the optional power action. The power action only runs
    /// when release succeeded or was disabled.
    #[instrument(skip(self, host, request), fields(host = %host.name, reservation = %request.reservation_id))]
    pub async fn end(&self, host: &Host, request: &EndReservation) -> ReservationOutcome {
        let ctx = StepContext {
            host,
            reservation_id: &request.reservation_id,
            lab_id: request.lab_id.as_deref(),
        };
        let mut steps = Vec::new();
        let mut success = true;

        if request.release {
            let args = request
                .release_args
                .clone()
                .unwrap_or_else(|| vec![agent::RELEASE_DEFAULT_ARG.to_string()]);
            let step = self
                .command_step(&ctx, "release", agent::RELEASE_COMMAND, args)
                .await;
            success &= step.success;
            steps.push(step);
        }

        if let (true, Some(power)) = (success, request.power_action.as_ref()) {
            let mode = power
                .mode
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| agent::POWER_DEFAULT_MODE.to_string());
            let mut args = vec![mode.clone()];
            args.extend(power.args.clone().unwrap_or_default());
            let action = format!("power:{}", mode);
            let step = self
                .command_step(&ctx, &action, agent::POWER_COMMAND, args)
                .await;
            success &= step.success;
            steps.push(step);
        }

        info!(
            "Reservation {} end on {}: {}",
            request.reservation_id,
            host.name,
            if success { "ok" } else { "failed" }
        );
        outcome(&ctx, success, steps)
    }

    async fn wake_step(&self, ctx: &StepContext<'_>, options: &WakeOptions) -> StepResult {
        let host = ctx.host;

        let Some(mac) = first_present(&[options.mac.as_ref(), host.mac.as_ref()]) else {
            let step = StepResult::rejected("wake", "MAC address not configured");
            self.audit(ctx, &step).await;
            return step;
        };
        let Some(ping_target) = first_present(&[
            options.ping_target.as_ref(),
            host.ping_target.as_ref(),
            Some(&host.address),
        ]) else {
            let step = StepResult::rejected("wake", "Ping target not configured");
            self.audit(ctx, &step).await;
            return step;
        };

        let wait_seconds = options
            .ping_timeout
            .unwrap_or(self.defaults.wake_wait_seconds);
        if let Err(e) = wait_duration(wait_seconds) {
            let step = StepResult::rejected("wake", &format!("Invalid ping timeout: {}", e));
            self.audit(ctx, &step).await;
            return step;
        }

        let request = WakeRequest {
            mac,
            broadcast: first_present(&[options.broadcast.as_ref(), host.broadcast.as_ref()]),
            port: options.port.unwrap_or(host.wol_port),
            ping_target,
            attempts: options.attempts.unwrap_or(host.wake_attempts),
            wait_seconds,
        };

        let started = Instant::now();
        let (reached, attempts_used, message) = match self.prober.wake_and_wait(&request).await {
            Ok(outcome) if outcome.reached => (true, outcome.attempts_used, "Host reachable".to_string()),
            Ok(outcome) => (
                false,
                outcome.attempts_used,
                "Host did not respond to ping".to_string(),
            ),
            Err(e) => {
                warn!("Wake of {} failed: {}", host.name, e);
                (false, 0, e.to_string())
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let step = StepResult {
            action: "wake".to_string(),
            status: StepStatus::from_success(reached),
            success: reached,
            message,
            duration_ms: Some(duration_ms),
            details: StepDetails::Wake(WakeDetails {
                mac: request.mac,
                ping_target: request.ping_target,
                attempts_requested: request.attempts,
                attempts_used,
                wait_seconds: request.wait_seconds,
                port: request.port,
                broadcast: request.broadcast,
            }),
            response_code: Some(if reached {
                wake::REACHED_CODE
            } else {
                wake::UNREACHED_CODE
            }),
        };
        self.audit(ctx, &step).await;
        step
    }

    async fn command_step(
        &self,
        ctx: &StepContext<'_>,
        action: &str,
        command: &str,
        args: Vec<String>,
    ) -> StepResult {
        let started = Instant::now();
        let result = self
            .gateway
            .execute(ctx.host, command, &args, &SessionOverrides::default())
            .await;

        let (success, message, details) = match result {
            Ok(output) => (
                output.succeeded(),
                format!("Exit code {}", output.exit_code),
                CommandDetails {
                    exit_code: Some(output.exit_code),
                    stdout: output.stdout.trim().to_string(),
                    stderr: output.stderr.trim().to_string(),
                    args,
                    duration_ms: output.duration_ms,
                },
            ),
            Err(e) => {
                warn!("{} on {} failed: {}", action, ctx.host.name, e);
                (
                    false,
                    e.to_string(),
                    CommandDetails {
                        exit_code: None,
                        stdout: String::new(),
                        stderr: String::new(),
                        args,
                        duration_ms: started.elapsed().as_millis() as u64,
                    },
                )
            }
        };

        let step = StepResult {
            action: action.to_string(),
            status: StepStatus::from_success(success),
            success,
            message,
            duration_ms: Some(details.duration_ms),
            response_code: details.exit_code.map(i64::from),
            details: StepDetails::Command(details),
        };
        self.audit(ctx, &step).await;
        step
    }

    /// Audit failures never change the step outcome.
    async fn audit(&self, ctx: &StepContext<'_>, step: &StepResult) {
        let Some(database) = &self.database else {
            return;
        };

        let payload = match &step.details {
            StepDetails::Empty {} => None,
            details => match serde_json::to_string(details) {
                Ok(json) => Some(json),
                Err(e) => {
                    error!("Failed to serialize {} details: {}", step.action, e);
                    None
                }
            },
        };

        let operation = ReservationOperation {
            id: Uuid::new_v4().to_string(),
            reservation_id: ctx.reservation_id.to_string(),
            lab_id: ctx.lab_id.map(str::to_string),
            host: ctx.host.name.clone(),
            action: step.action.clone(),
            status: step.status.as_str().to_string(),
            success: step.success,
            response_code: step.response_code,
            duration_ms: step.duration_ms.map(|d| d as i64),
            payload,
            message: Some(step.message.clone()),
            created_at: Utc::now(),
        };

        if let Err(e) = database.store_reservation_operation(&operation).await {
            error!(
                "Audit write for {}/{} dropped: {}",
                ctx.reservation_id,
                step.action,
                OpsError::persistence(&e)
            );
        }
    }
}

fn first_present(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn outcome(ctx: &StepContext<'_>, success: bool, steps: Vec<StepResult>) -> ReservationOutcome {
    ReservationOutcome {
        success,
        reservation_id: ctx.reservation_id.to_string(),
        host: ctx.host.name.clone(),
        lab_id: ctx.lab_id.map(str::to_string),
        steps,
    }
}
