//! Reservation audit database operations.
//!
//! Rows are append-only.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error};

use super::records::ReservationOperation;
use super::Database;

impl Database {
    pub async fn store_reservation_operation(&self, operation: &ReservationOperation) -> Result<()> {
        debug!(
            "Storing reservation operation {} ({}/{})",
            operation.id, operation.reservation_id, operation.action
        );

        match sqlx::query(
            r#"
            INSERT INTO reservation_operations (
                id, reservation_id, lab_id, host, action, status, success,
                response_code, duration_ms, payload, message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&operation.id)
        .bind(&operation.reservation_id)
        .bind(&operation.lab_id)
        .bind(&operation.host)
        .bind(&operation.action)
        .bind(&operation.status)
        .bind(operation.success)
        .bind(operation.response_code)
        .bind(operation.duration_ms)
        .bind(&operation.payload)
        .bind(&operation.message)
        .bind(operation.created_at)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(
                    "Failed to store reservation operation {}/{}: {}",
                    operation.reservation_id, operation.action, e
                );
                Err(e.into())
            }
        }
    }

    /// In the order the steps were recorded.
    pub async fn get_reservation_operations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<ReservationOperation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reservation_id, lab_id, host, action, status, success,
                   response_code, duration_ms, payload, message, created_at
            FROM reservation_operations
            WHERE reservation_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(operation_from_row).collect()
    }

    /// Most recent first.
    pub async fn get_host_operations(
        &self,
        host_name: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ReservationOperation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reservation_id, lab_id, host, action, status, success,
                   response_code, duration_ms, payload, message, created_at
            FROM reservation_operations
            WHERE host = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(host_name.to_lowercase())
        .bind(limit.unwrap_or(50))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(operation_from_row).collect()
    }
}

fn operation_from_row(row: &SqliteRow) -> Result<ReservationOperation> {
    Ok(ReservationOperation {
        id: row.try_get("id")?,
        reservation_id: row.try_get("reservation_id")?,
        lab_id: row.try_get("lab_id")?,
        host: row.try_get("host")?,
        action: row.try_get("action")?,
        status: row.try_get("status")?,
        success: row.try_get("success")?,
        response_code: row.try_get("response_code")?,
        duration_ms: row.try_get("duration_ms")?,
        payload: row.try_get("payload")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}
