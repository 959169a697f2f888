//! This module provides reusable test utilities:
//! - Mock WS-Management server
//! - Scripted gateway, prober and liveness fakes
//! - Test configuration builders
//! - In-memory test databases
//! - Common test data

// Allow unused code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fakes;
pub mod mock_wsman;
pub mod test_config;
pub mod test_data;
pub mod test_database;

// Re-export commonly used items
pub use fakes::{FixedLiveness, ScriptedGateway, ScriptedProbe};
pub use mock_wsman::MockWsmanServer;
pub use test_config::{HostEntryBuilder, TestConfig, TestConfigBuilder};
pub use test_data::*;
pub use test_database::TestDatabase;
