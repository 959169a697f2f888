//! ICMP liveness check through the system `ping` binary.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, warn};

/// One reachability probe against a target.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// `true` only when the target answered within `wait`. Never errors:
    /// an unusable probe counts as "not reachable".
    async fn is_up(&self, target: &str, wait: Duration) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct IcmpPing;

impl IcmpPing {
    fn command(target: &str, wait: Duration) -> AsyncCommand {
        let mut command = AsyncCommand::new("ping");
        if cfg!(windows) {
            let millis = wait.as_millis().max(1).to_string();
            command.args(["-n", "1", "-w", millis.as_str(), target]);
        } else {
            let seconds = wait.as_secs().max(1).to_string();
            command.args(["-c", "1", "-W", seconds.as_str(), target]);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl LivenessCheck for IcmpPing {
    async fn is_up(&self, target: &str, wait: Duration) -> bool {
        if target.trim().is_empty() {
            return false;
        }

        // ping's own deadline plus slack, so a wedged child cannot hang the step
        let bound = wait.max(Duration::from_secs(1)) + Duration::from_secs(2);
        match timeout(bound, Self::command(target, wait).status()).await {
            Ok(Ok(status)) => {
                debug!("ping {} exited with {}", target, status);
                status.success()
            }
            Ok(Err(e)) => {
                warn!("ping command unavailable; skipping reachability check: {}", e);
                false
            }
            Err(_) => {
                warn!("ping {} did not finish within {:?}", target, bound);
                false
            }
        }
    }
}
