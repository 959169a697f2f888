//! Custom error types for the ops worker
//!
//! Provides structured error handling for the operations that are surfaced to
//! callers. Internal plumbing (database, config loading, WS-Man transport) uses
//! `anyhow` and is converted at the component boundary.

use std::fmt;

/// Main error type for the ops worker
#[derive(Debug)]
pub enum OpsError {
    /// Request cannot be served with the current configuration
    Configuration(ConfigurationError),

    /// Remote agent unreachable or the WS-Man exchange failed
    RemoteExecution { host: String, reason: String },

    /// Remote file read reported a nonzero status
    RemoteRead {
        host: String,
        path: String,
        exit_code: i32,
        stderr: String,
    },

    /// Telemetry payload is not valid JSON
    TelemetryParse { host: String, reason: String },

    /// Audit or telemetry store write failed
    Persistence { reason: String },
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigurationError {
    /// Host name not present in the directory
    UnknownHost { name: String },

    /// Neither the request nor the host supplies a username/password pair
    MissingCredentials { host: String },

    /// Wake requested without a MAC address or ping target
    MissingWakeTarget { field: String },

    /// Configured WinRM transport is not implemented
    UnsupportedTransport { host: String, transport: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },
}

impl OpsError {
    pub fn unknown_host(name: &str) -> Self {
        OpsError::Configuration(ConfigurationError::UnknownHost {
            name: name.to_string(),
        })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, OpsError::Configuration(_))
    }

    pub fn is_unknown_host(&self) -> bool {
        matches!(
            self,
            OpsError::Configuration(ConfigurationError::UnknownHost { .. })
        )
    }
}

impl fmt::Display for OpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpsError::Configuration(e) => write!(f, "Configuration error: {}", e),
            OpsError::RemoteExecution { host, reason } => {
                write!(f, "Remote execution on {} failed: {}", host, reason)
            }
            OpsError::RemoteRead {
                host,
                path,
                exit_code,
                stderr,
            } => {
                write!(
                    f,
                    "WinRM read of '{}' on {} failed ({}): {}",
                    path, host, exit_code, stderr
                )
            }
            OpsError::TelemetryParse { host, reason } => {
                write!(f, "Invalid telemetry from {}: {}", host, reason)
            }
            OpsError::Persistence { reason } => write!(f, "Persistence error: {}", reason),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::UnknownHost { name } => {
                write!(f, "host '{}' not found in config", name)
            }
            ConfigurationError::MissingCredentials { host } => {
                write!(f, "WinRM credentials are required for '{}'", host)
            }
            ConfigurationError::MissingWakeTarget { field } => {
                write!(f, "{} is required", field)
            }
            ConfigurationError::UnsupportedTransport { host, transport } => {
                write!(
                    f,
                    "WinRM transport '{}' configured for '{}' is not supported",
                    transport, host
                )
            }
            ConfigurationError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for OpsError {}
impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for OpsError {
    fn from(err: ConfigurationError) -> Self {
        OpsError::Configuration(err)
    }
}

impl OpsError {
    /// Store failure from the database layer, with its cause chain.
    pub fn persistence(err: &anyhow::Error) -> Self {
        OpsError::Persistence {
            reason: format!("{:#}", err),
        }
    }
}
