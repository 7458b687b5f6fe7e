//! # Sync Log Repository
//!
//! Append-only audit trail of synchronization attempts (`sales_log` table).
//! Every pass writes exactly one row, whatever its outcome.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use digisales_core::SyncLog;

/// Repository for the sync audit log.
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pool: SqlitePool,
}

impl SyncLogRepository {
    /// Creates a new SyncLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncLogRepository { pool }
    }

    /// Appends one entry stamped with the current time.
    pub async fn append(&self, orders_loaded: i64, note: &str, errors: &str) -> DbResult<SyncLog> {
        let entry = SyncLog {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            orders_loaded,
            note: note.to_string(),
            errors: errors.to_string(),
        };

        sqlx::query(
            r#"
            INSERT INTO sales_log (id, timestamp, orders_loaded, note, errors)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.timestamp)
        .bind(entry.orders_loaded)
        .bind(&entry.note)
        .bind(&entry.errors)
        .execute(&self.pool)
        .await?;

        debug!(id = %entry.id, orders_loaded, note, "Sync log entry appended");
        Ok(entry)
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<SyncLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, orders_loaded, note, errors
            FROM sales_log
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::map_row).collect()
    }

    /// Counts all entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    fn map_row(row: SqliteRow) -> DbResult<SyncLog> {
        Ok(SyncLog {
            id: row.try_get("id")?,
            timestamp: row.try_get("timestamp")?,
            orders_loaded: row.try_get("orders_loaded")?,
            note: row.try_get("note")?,
            errors: row.try_get("errors")?,
        })
    }
}
