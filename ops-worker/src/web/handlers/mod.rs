//! HTTP request handlers for the ops worker API.
//!
//! This module is organized by domain:
//! - `common` - Response envelope, error mapping and query structs
//! - `health` - Liveness endpoint
//! - `hosts` - Host directory and heartbeat history
//! - `operations` - Direct wake, remote command and heartbeat poll
//! - `reservations` - Reservation start/end and audit trail

pub mod common;
pub mod health;
pub mod hosts;
pub mod operations;
pub mod reservations;

pub use health::*;
pub use hosts::*;
pub use operations::*;
pub use reservations::*;
