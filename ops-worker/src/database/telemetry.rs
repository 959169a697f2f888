//! Host, heartbeat and event database operations.

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::records::{HeartbeatRecord, HostEventRecord, HostRecord};
use super::Database;
use crate::config::Host;
use crate::constants::polling::SESSION_GUARD_KIND;
use crate::telemetry::{HeartbeatSnapshot, SessionGuardEvent};

impl Database {
    /// Upserts the host row and appends the heartbeat (and event, if any) in
    /// one transaction. Returns the host row id.
    pub async fn record_heartbeat(
        &self,
        host: &Host,
        snapshot: &HeartbeatSnapshot,
        event: Option<&SessionGuardEvent>,
    ) -> Result<i64> {
        let fields = &snapshot.fields;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Must stay the first statement: a leading read makes concurrent
        // writers fail with SQLITE_BUSY on lock upgrade.
        let host_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO lab_hosts (name, address, mac, last_seen) VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                address = excluded.address,
                mac = excluded.mac,
                last_seen = excluded.last_seen
            RETURNING id
            "#,
        )
        .bind(&host.name)
        .bind(&host.address)
        .bind(&host.mac)
        .bind(fields.timestamp)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO lab_host_heartbeat (
                host_id, timestamp_utc, ready, local_mode, local_session,
                last_forced_logoff_ts, last_forced_logoff_user,
                last_power_action_ts, last_power_action_mode,
                raw_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(host_id)
        .bind(fields.timestamp)
        .bind(fields.ready)
        .bind(fields.local_mode)
        .bind(fields.local_session)
        .bind(fields.last_forced_logoff.timestamp)
        .bind(&fields.last_forced_logoff.user)
        .bind(fields.last_power_action.timestamp)
        .bind(&fields.last_power_action.mode)
        .bind(&snapshot.raw.text)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(event) = event {
            sqlx::query(
                r#"
                INSERT INTO lab_host_events (host_id, kind, timestamp_utc, payload, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(host_id)
            .bind(SESSION_GUARD_KIND)
            .bind(event.timestamp)
            .bind(&event.raw.text)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Heartbeat stored for {} (host_id {})", host.name, host_id);
        Ok(host_id)
    }

    pub async fn get_host(&self, name: &str) -> Result<Option<HostRecord>> {
        let row = sqlx::query("SELECT id, name, address, mac, last_seen FROM lab_hosts WHERE name = ?")
            .bind(name.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| host_from_row(&r)).transpose()
    }

    pub async fn list_hosts(&self) -> Result<Vec<HostRecord>> {
        let rows = sqlx::query("SELECT id, name, address, mac, last_seen FROM lab_hosts ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(host_from_row).collect()
    }

    /// Most recent first.
    pub async fn get_heartbeat_history(
        &self,
        host_name: &str,
        limit: Option<i64>,
    ) -> Result<Vec<HeartbeatRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT hb.id, hb.host_id, hb.timestamp_utc, hb.ready, hb.local_mode, hb.local_session,
                   hb.last_forced_logoff_ts, hb.last_forced_logoff_user,
                   hb.last_power_action_ts, hb.last_power_action_mode,
                   hb.raw_json, hb.created_at
            FROM lab_host_heartbeat hb
            JOIN lab_hosts h ON h.id = hb.host_id
            WHERE h.name = ?
            ORDER BY hb.timestamp_utc DESC, hb.id DESC
            LIMIT ?
            "#,
        )
        .bind(host_name.to_lowercase())
        .bind(limit.unwrap_or(50))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(HeartbeatRecord {
                id: row.try_get("id")?,
                host_id: row.try_get("host_id")?,
                timestamp_utc: row.try_get("timestamp_utc")?,
                ready: row.try_get("ready")?,
                local_mode: row.try_get("local_mode")?,
                local_session: row.try_get("local_session")?,
                last_forced_logoff_ts: row.try_get("last_forced_logoff_ts")?,
                last_forced_logoff_user: row.try_get("last_forced_logoff_user")?,
                last_power_action_ts: row.try_get("last_power_action_ts")?,
                last_power_action_mode: row.try_get("last_power_action_mode")?,
                raw_json: row.try_get("raw_json")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(records)
    }

    /// Most recent first.
    pub async fn get_host_events(
        &self,
        host_name: &str,
        limit: Option<i64>,
    ) -> Result<Vec<HostEventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT ev.id, ev.host_id, ev.kind, ev.timestamp_utc, ev.payload, ev.created_at
            FROM lab_host_events ev
            JOIN lab_hosts h ON h.id = ev.host_id
            WHERE h.name = ?
            ORDER BY ev.timestamp_utc DESC, ev.id DESC
            LIMIT ?
            "#,
        )
        .bind(host_name.to_lowercase())
        .bind(limit.unwrap_or(50))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(HostEventRecord {
                id: row.try_get("id")?,
                host_id: row.try_get("host_id")?,
                kind: row.try_get("kind")?,
                timestamp_utc: row.try_get("timestamp_utc")?,
                payload: row.try_get("payload")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(records)
    }
}

fn host_from_row(row: &SqliteRow) -> Result<HostRecord> {
    Ok(HostRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        mac: row.try_get("mac")?,
        last_seen: row.try_get("last_seen")?,
    })
}
