pub mod ops_service;

pub use ops_service::{HeartbeatReport, OpsService, WakeCommand, WakeReport};
