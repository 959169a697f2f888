//! Periodic heartbeat polling
//!
//! Sweeps every configured host on a fixed interval, one host at a time.
//! The first sweep runs immediately on start. Failures for one host are
//! logged and never stop the sweep or the loop.
//!
//! # Configuration
//!
//! ```toml
//! # config/main.toml
//! poll_enabled = true
//! poll_interval_seconds = 60
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::HostDirectory;
use crate::telemetry::HeartbeatIngestor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub polled: usize,
    pub failed: usize,
}

pub struct HeartbeatPoller {
    directory: Arc<HostDirectory>,
    ingestor: Arc<HeartbeatIngestor>,
    interval: Duration,
}

impl HeartbeatPoller {
    pub fn new(
        directory: Arc<HostDirectory>,
        ingestor: Arc<HeartbeatIngestor>,
        interval: Duration,
    ) -> Self {
        Self {
            directory,
            ingestor,
            interval,
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            "Heartbeat poller started ({}s interval, {} hosts)",
            self.interval.as_secs(),
            self.directory.len()
        );

        tokio::spawn(async move {
            let mut interval = sweep_interval(self.interval);
            let mut sweep_count = 0u64;

            loop {
                interval.tick().await;
                sweep_count += 1;

                let summary = self.poll_all_hosts().await;
                if summary.failed > 0 || sweep_count.is_multiple_of(10) {
                    info!(
                        "Heartbeat sweep #{}: {} polled, {} failed",
                        sweep_count, summary.polled, summary.failed
                    );
                }
            }
        })
    }

    pub async fn poll_all_hosts(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        for host in self.directory.all_hosts() {
            match self.ingestor.poll(host, true).await {
                Ok(_) => {
                    info!("Polled heartbeat for {}", host.name);
                    summary.polled += 1;
                }
                Err(e) => {
                    error!("Heartbeat poll failed for {}: {}", host.name, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// First tick fires immediately; a sweep that overruns pushes the next one
/// back instead of bursting to catch up.
fn sweep_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
