//! Scripted stand-ins for the network-facing traits

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use ops_worker::config::Host;
use ops_worker::errors::OpsError;
use ops_worker::remote::{CommandGateway, CommandOutput, SessionOverrides};
use ops_worker::wake::{LivenessCheck, ReachabilityProbe, WakeOutcome, WakeRequest};

/// A recorded `execute` call
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub host: String,
    pub command: String,
    pub args: Vec<String>,
}

enum FileScript {
    Content(String),
    Missing(i32),
    Unreachable,
}

/// `CommandGateway` answering from a script instead of a real agent
#[derive(Default)]
pub struct ScriptedGateway {
    exit_codes: HashMap<String, i32>,
    unreachable: bool,
    files: HashMap<String, FileScript>,
    calls: Mutex<Vec<ExecutedCommand>>,
    reads: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unscripted commands exit 0
    pub fn with_exit_code(mut self, command: &str, exit_code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), exit_code);
        self
    }

    /// Every `execute` fails with a transport error
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files
            .insert(path.to_string(), FileScript::Content(content.to_string()));
        self
    }

    /// Unscripted paths are missing too
    pub fn with_missing_file(mut self, path: &str, exit_code: i32) -> Self {
        self.files
            .insert(path.to_string(), FileScript::Missing(exit_code));
        self
    }

    pub fn with_unreachable_file(mut self, path: &str) -> Self {
        self.files.insert(path.to_string(), FileScript::Unreachable);
        self
    }

    pub fn calls(&self) -> Vec<ExecutedCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandGateway for ScriptedGateway {
    async fn execute(
        &self,
        host: &Host,
        command: &str,
        args: &[String],
        _overrides: &SessionOverrides,
    ) -> Result<CommandOutput, OpsError> {
        self.calls.lock().unwrap().push(ExecutedCommand {
            host: host.name.clone(),
            command: command.to_string(),
            args: args.to_vec(),
        });

        if self.unreachable {
            return Err(OpsError::RemoteExecution {
                host: host.name.clone(),
                reason: "connection refused".to_string(),
            });
        }

        let exit_code = self.exit_codes.get(command).copied().unwrap_or(0);
        Ok(CommandOutput {
            exit_code,
            stdout: format!("  {} done\r\n", command),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{} failed\r\n", command)
            },
            duration_ms: 42,
        })
    }

    async fn read_file(&self, host: &Host, path: &str) -> Result<String, OpsError> {
        self.reads.lock().unwrap().push(path.to_string());

        match self.files.get(path) {
            Some(FileScript::Content(content)) => Ok(content.clone()),
            Some(FileScript::Unreachable) => Err(OpsError::RemoteExecution {
                host: host.name.clone(),
                reason: "timed out after 120s".to_string(),
            }),
            Some(FileScript::Missing(exit_code)) => Err(OpsError::RemoteRead {
                host: host.name.clone(),
                path: path.to_string(),
                exit_code: *exit_code,
                stderr: format!("Cannot find path '{}' because it does not exist.", path),
            }),
            None => Err(OpsError::RemoteRead {
                host: host.name.clone(),
                path: path.to_string(),
                exit_code: 1,
                stderr: format!("Cannot find path '{}' because it does not exist.", path),
            }),
        }
    }
}

/// `ReachabilityProbe` that reaches the host at a fixed probe index
pub struct ScriptedProbe {
    first_up: Option<u32>,
    fail_with: Option<String>,
    requests: Mutex<Vec<WakeRequest>>,
}

impl ScriptedProbe {
    pub fn reachable_at(attempt: u32) -> Self {
        Self {
            first_up: Some(attempt),
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn never_reachable() -> Self {
        Self {
            first_up: None,
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            first_up: None,
            fail_with: Some(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<WakeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn wake_and_wait(&self, request: &WakeRequest) -> Result<WakeOutcome> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(reason) = &self.fail_with {
            return Err(anyhow!("{}", reason));
        }

        Ok(match self.first_up {
            Some(n) if n >= 1 && n <= request.attempts => WakeOutcome {
                reached: true,
                attempts_used: n,
                elapsed_ms: 5,
            },
            _ => WakeOutcome {
                reached: false,
                attempts_used: request.attempts,
                elapsed_ms: 5,
            },
        })
    }
}

/// `LivenessCheck` with a constant answer, for driving the real prober
pub struct FixedLiveness {
    pub up: bool,
    pub probes: Mutex<u32>,
}

impl FixedLiveness {
    pub fn new(up: bool) -> Self {
        Self {
            up,
            probes: Mutex::new(0),
        }
    }

    pub fn probe_count(&self) -> u32 {
        *self.probes.lock().unwrap()
    }
}

#[async_trait]
impl LivenessCheck for FixedLiveness {
    async fn is_up(&self, _target: &str, _wait: Duration) -> bool {
        *self.probes.lock().unwrap() += 1;
        self.up
    }
}
