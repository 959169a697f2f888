//! Heartbeat telemetry: payload normalization and ingestion

pub mod ingestor;
pub mod snapshot;

pub use ingestor::{HeartbeatIngestor, HeartbeatPoll, SideChannel};
pub use snapshot::{
    parse_utc_timestamp, ForcedLogoff, HeartbeatFields, HeartbeatSnapshot, PowerActionRecord,
    RawPayload, SessionGuardEvent,
};
