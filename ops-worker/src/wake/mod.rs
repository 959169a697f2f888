//! Reachability prober
//!
//! Sends a single Wake-on-LAN magic packet and then polls the host with ICMP
//! until it answers or the attempt budget is spent.
//!
//! ```text
//! magic packet ──► sleep(wait) ──► ping ──► reachable? ──► done (attempt n)
//!                     ▲                         │ no
//!                     └─────── n < attempts ◄───┘
//! ```

pub mod magic_packet;
pub mod ping;

pub use magic_packet::{magic_packet, parse_mac, send_magic_packet};
pub use ping::{IcmpPing, LivenessCheck};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::constants::wake::MAX_WAIT_SECONDS;

/// Per-attempt wait as a `Duration`. Negative, non-finite and values above
/// `MAX_WAIT_SECONDS` are rejected.
pub fn wait_duration(seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || !(0.0..=MAX_WAIT_SECONDS).contains(&seconds) {
        bail!(
            "wait of {} seconds is outside 0..={}",
            seconds,
            MAX_WAIT_SECONDS
        );
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeRequest {
    pub mac: String,
    pub broadcast: Option<String>,
    pub port: u16,
    pub ping_target: String,
    pub attempts: u32,
    pub wait_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeOutcome {
    pub reached: bool,
    /// 1-based index of the probe that succeeded, or `attempts` when none did
    pub attempts_used: u32,
    pub elapsed_ms: u64,
}

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Errors only when the wake signal itself cannot be sent.
    async fn wake_and_wait(&self, request: &WakeRequest) -> Result<WakeOutcome>;
}

pub struct NetworkProber {
    liveness: Arc<dyn LivenessCheck>,
}

impl NetworkProber {
    pub fn new() -> Self {
        Self::with_liveness(Arc::new(IcmpPing))
    }

    pub fn with_liveness(liveness: Arc<dyn LivenessCheck>) -> Self {
        Self { liveness }
    }
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReachabilityProbe for NetworkProber {
    #[instrument(skip(self, request), fields(mac = %request.mac, target = %request.ping_target))]
    async fn wake_and_wait(&self, request: &WakeRequest) -> Result<WakeOutcome> {
        let wait = wait_duration(request.wait_seconds)?;
        let started = Instant::now();
        send_magic_packet(&request.mac, request.broadcast.as_deref(), request.port).await?;

        for attempt in 1..=request.attempts {
            sleep(wait).await;
            if self.liveness.is_up(&request.ping_target, wait).await {
                info!(
                    "{} reachable after attempt {}/{}",
                    request.ping_target, attempt, request.attempts
                );
                return Ok(WakeOutcome {
                    reached: true,
                    attempts_used: attempt,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        }

        info!(
            "{} did not respond after {} attempts",
            request.ping_target, request.attempts
        );
        Ok(WakeOutcome {
            reached: false,
            attempts_used: request.attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
