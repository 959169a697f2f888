//! Database layer for the ops worker.
//!
//! This module provides SQLite persistence for:
//! - Lab hosts (one row per host, refreshed on every heartbeat)
//! - Heartbeat history (one row per poll, never overwritten)
//! - Host events (session-guard log tails)
//! - Reservation operations (one audit row per orchestration step)
//!
//! The module is organized into submodules:
//! - `records` - All record types (entities)
//! - `telemetry` - Host, heartbeat and event operations
//! - `reservations` - Reservation audit operations

mod records;
mod reservations;
mod telemetry;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Expose pool for integration test queries
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Opening database at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Failed to create parent directory {:?}: {}", parent, e);
                return Err(e.into());
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = match SqlitePool::connect(&database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to database {}: {}", database_url, e);
                return Err(e.into());
            }
        };

        let database = Self { pool };
        database.initialize_tables().await?;

        info!("Database initialized at {}", database_path);
        Ok(database)
    }

    /// Single-connection in-memory database; the connection is never recycled
    /// so the schema lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let statements = [
            (
                "lab_hosts",
                r#"
                CREATE TABLE IF NOT EXISTS lab_hosts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    address TEXT,
                    mac TEXT,
                    last_seen DATETIME
                )
                "#,
            ),
            (
                "lab_host_heartbeat",
                r#"
                CREATE TABLE IF NOT EXISTS lab_host_heartbeat (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    host_id INTEGER NOT NULL REFERENCES lab_hosts(id),
                    timestamp_utc DATETIME NOT NULL,
                    ready BOOLEAN,
                    local_mode BOOLEAN,
                    local_session BOOLEAN,
                    last_forced_logoff_ts DATETIME,
                    last_forced_logoff_user TEXT,
                    last_power_action_ts DATETIME,
                    last_power_action_mode TEXT,
                    raw_json TEXT NOT NULL,
                    created_at DATETIME NOT NULL
                )
                "#,
            ),
            (
                "idx_heartbeat_host_timestamp",
                "CREATE INDEX IF NOT EXISTS idx_heartbeat_host_timestamp ON lab_host_heartbeat(host_id, timestamp_utc DESC)",
            ),
            (
                "lab_host_events",
                r#"
                CREATE TABLE IF NOT EXISTS lab_host_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    host_id INTEGER NOT NULL REFERENCES lab_hosts(id),
                    kind TEXT NOT NULL,
                    timestamp_utc DATETIME NOT NULL,
                    payload TEXT NOT NULL,
                    created_at DATETIME NOT NULL
                )
                "#,
            ),
            (
                "idx_events_host_timestamp",
                "CREATE INDEX IF NOT EXISTS idx_events_host_timestamp ON lab_host_events(host_id, timestamp_utc DESC)",
            ),
            (
                "reservation_operations",
                r#"
                CREATE TABLE IF NOT EXISTS reservation_operations (
                    id TEXT PRIMARY KEY,
                    reservation_id TEXT NOT NULL,
                    lab_id TEXT,
                    host TEXT NOT NULL,
                    action TEXT NOT NULL,
                    status TEXT NOT NULL,
                    success BOOLEAN NOT NULL,
                    response_code INTEGER,
                    duration_ms INTEGER,
                    payload TEXT,
                    message TEXT,
                    created_at DATETIME NOT NULL
                )
                "#,
            ),
            (
                "idx_reservation_operations_reservation",
                "CREATE INDEX IF NOT EXISTS idx_reservation_operations_reservation ON reservation_operations(reservation_id, created_at)",
            ),
            (
                "idx_reservation_operations_host",
                "CREATE INDEX IF NOT EXISTS idx_reservation_operations_host ON reservation_operations(host, created_at DESC)",
            ),
        ];

        for (name, sql) in statements {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                error!("Failed to create {}: {}", name, e);
                return Err(e.into());
            }
            debug!("{} ready", name);
        }

        Ok(())
    }
}
