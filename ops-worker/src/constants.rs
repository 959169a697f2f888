//! Central repository for defaults, timeouts and fixed identifiers
//!
//! Values here are used when neither a request nor the host entry nor
//! `[defaults]` in `main.toml` supplies one.

use std::time::Duration;

/// Remote agent defaults
pub mod agent {
    /// Administrative executable invoked on every lab station
    pub const LABSTATION_EXE: &str = r"C:\LabStation\LabStation.exe";

    /// Heartbeat telemetry file written by the agent
    pub const HEARTBEAT_PATH: &str = r"C:\LabStation\labstation\data\telemetry\heartbeat.json";

    /// Session-guard event log (JSON lines)
    pub const EVENTS_PATH: &str =
        r"C:\LabStation\labstation\data\telemetry\session-guard-events.jsonl";

    pub const PREPARE_COMMAND: &str = "prepare-session";
    pub const RELEASE_COMMAND: &str = "release-session";
    pub const POWER_COMMAND: &str = "power";

    /// Default `--guard-grace` handed to prepare-session (seconds)
    pub const GUARD_GRACE_SECONDS: u32 = 90;

    pub const RELEASE_DEFAULT_ARG: &str = "--reboot";
    pub const POWER_DEFAULT_MODE: &str = "shutdown";
}

/// WinRM / WS-Management defaults
pub mod winrm {
    use super::Duration;

    pub const HTTP_PORT: u16 = 5985;
    pub const HTTPS_PORT: u16 = 5986;
    pub const TRANSPORT: &str = "basic";

    /// Upper bound for a whole remote operation (shell open to shell delete)
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(120);

    /// Server-side operation timeout advertised in each envelope
    pub const OPERATION_TIMEOUT_SECONDS: u64 = 20;

    pub const MAX_ENVELOPE_SIZE: u32 = 153_600;

    /// Reported when a command finishes without an ExitCode element
    pub const UNKNOWN_EXIT_CODE: i32 = -1;
}

/// Wake-on-LAN and reachability defaults
pub mod wake {
    pub const WOL_PORT: u16 = 9;
    pub const ATTEMPTS: u32 = 3;
    pub const WAIT_SECONDS: f64 = 10.0;
    /// Upper bound for a caller-supplied per-attempt wait
    pub const MAX_WAIT_SECONDS: f64 = 600.0;
    pub const LIMITED_BROADCAST: &str = "255.255.255.255";

    /// Audit response codes recorded for the wake step
    pub const REACHED_CODE: i64 = 200;
    pub const UNREACHED_CODE: i64 = 504;
}

/// Heartbeat polling defaults
pub mod polling {
    pub const INTERVAL_SECONDS: u64 = 60;

    /// Event kind recorded for the session-guard log tail
    pub const SESSION_GUARD_KIND: &str = "session-guard";
}
