pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod remote;
pub mod reservation;
pub mod scheduler;
pub mod services;
pub mod telemetry;
pub mod wake;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigManager, Host, HostDirectory};
pub use database::Database;
pub use errors::{ConfigurationError, OpsError};
pub use remote::{CommandGateway, WinRmGateway};
pub use reservation::ReservationOrchestrator;
pub use scheduler::HeartbeatPoller;
pub use services::OpsService;
pub use telemetry::HeartbeatIngestor;
pub use wake::{NetworkProber, ReachabilityProbe};
