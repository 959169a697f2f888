//! Test database utilities for in-memory SQLite testing

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

use ops_worker::database::Database;

/// In-memory store with the full schema applied
pub struct TestDatabase {
    database: Arc<Database>,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            database: Arc::new(Database::in_memory().await?),
        })
    }

    pub fn database(&self) -> Arc<Database> {
        self.database.clone()
    }

    /// Raw pool for assertions the store API does not expose
    pub fn pool(&self) -> &SqlitePool {
        self.database.pool()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.pool())
            .await
            .expect("count query failed")
    }
}
