// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed primary queue.
//!
//! The [`Database`] struct is the primary tier of the durable queue. Ids are
//! assigned from the row sequence (`op-{seq}`) once the record is stored.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::operation::{NewOperation, OfflineOperation, SyncStatus};
use crate::stats::StatusCounts;
use crate::store::{apply_mark, Mark, QueueStore};

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL schema for the offline operation queue.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS offline_operations (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT UNIQUE,
    owner_id TEXT NOT NULL,
    operation_type TEXT NOT NULL,
    payload TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 3 CHECK (priority BETWEEN 1 AND 5),
    sync_status TEXT NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 5,
    created_at TEXT NOT NULL,
    scheduled_sync_at TEXT,
    last_attempt_at TEXT,
    synced_at TEXT,
    error_message TEXT,
    device_id TEXT NOT NULL,
    session_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ops_drain
    ON offline_operations(owner_id, sync_status, priority, created_at);
CREATE INDEX IF NOT EXISTS idx_ops_synced
    ON offline_operations(owner_id, synced_at);
"#;

const COLUMNS: &str = "id, owner_id, operation_type, payload, priority, sync_status,
    retry_count, max_retries, created_at, scheduled_sync_at, last_attempt_at,
    synced_at, error_message, device_id, session_id";

const ORDER: &str = "ORDER BY priority ASC, created_at ASC, seq ASC";

/// Formats a timestamp with fixed millisecond width so text order matches time order.
pub(crate) fn fmt_ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value
        .parse()
        .map_err(|_| conversion_error(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_error(format!("invalid timestamp '{value}' in column '{column}'")))
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|s| parse_timestamp(&s, column)).transpose()
}

fn row_to_operation(row: &Row<'_>) -> std::result::Result<OfflineOperation, rusqlite::Error> {
    let type_str: String = row.get(2)?;
    let payload_str: String = row.get(3)?;
    let priority: i64 = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(8)?;

    let payload = serde_json::from_str(&payload_str)
        .map_err(|_| conversion_error(format!("invalid payload '{payload_str}'")))?;
    let priority = u8::try_from(priority)
        .ok()
        .and_then(|p| crate::operation::Priority::new(p).ok())
        .ok_or_else(|| conversion_error(format!("invalid priority {priority}")))?;

    Ok(OfflineOperation {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        operation_type: parse_db(&type_str, "operation_type")?,
        payload,
        priority,
        sync_status: parse_db(&status_str, "sync_status")?,
        retry_count: row.get(6)?,
        max_retries: row.get(7)?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        scheduled_sync_at: parse_timestamp_opt(row.get(9)?, "scheduled_sync_at")?,
        last_attempt_at: parse_timestamp_opt(row.get(10)?, "last_attempt_at")?,
        synced_at: parse_timestamp_opt(row.get(11)?, "synced_at")?,
        error_message: row.get(12)?,
        device_id: row.get(13)?,
        session_id: row.get(14)?,
    })
}

/// Returns true for errors caused by one undecodable row rather than by the database.
fn is_row_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..)
    )
}

/// Run schema creation and migrations on a database connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(Error::CorruptedData(format!(
            "queue schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }
    if version < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    Ok(())
}

/// SQLite database connection holding the primary queue.
pub struct Database {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl Database {
    /// Open a database connection at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL mode lets the sync loop and one-shot commands share the file
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }

    fn query_operations(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<OfflineOperation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_operation)?;

        let mut ops = Vec::new();
        for row in rows {
            match row {
                Ok(op) => ops.push(op),
                Err(e) if is_row_decode_error(&e) => {
                    warn!(error = %e, "skipping undecodable queue row");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(ops)
    }

    /// Writes back every mutable column of a record.
    fn save_state(&self, op: &OfflineOperation) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE offline_operations
             SET sync_status = ?1, retry_count = ?2, last_attempt_at = ?3,
                 synced_at = ?4, error_message = ?5
             WHERE id = ?6",
            params![
                op.sync_status.as_str(),
                op.retry_count,
                op.last_attempt_at.as_ref().map(fmt_ts),
                op.synced_at.as_ref().map(fmt_ts),
                op.error_message,
                op.id,
            ],
        )?;

        if affected == 0 {
            return Err(Error::OperationNotFound(op.id.clone()));
        }
        Ok(())
    }

    fn mark(&mut self, id: &str, mark: Mark<'_>, at: DateTime<Utc>) -> Result<()> {
        let mut op = self.get(id)?;
        apply_mark(&mut op, mark, at)?;
        self.save_state(&op)
    }
}

impl QueueStore for Database {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        op.validate()?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO offline_operations (owner_id, operation_type, payload, priority,
             sync_status, retry_count, max_retries, created_at, scheduled_sync_at,
             device_id, session_id)
             VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, ?6, ?7, ?8, ?9)",
            params![
                op.owner_id,
                op.operation_type.as_str(),
                serde_json::to_string(&op.payload)?,
                op.priority.value(),
                op.max_retries,
                fmt_ts(&op.created_at),
                op.scheduled_sync_at.as_ref().map(fmt_ts),
                op.provenance.device_id,
                op.provenance.session_id,
            ],
        )?;
        let seq = tx.last_insert_rowid();
        let id = format!("op-{seq}");
        tx.execute(
            "UPDATE offline_operations SET id = ?1 WHERE seq = ?2",
            params![id, seq],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        let op = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM offline_operations WHERE id = ?1"),
                params![id],
                row_to_operation,
            )
            .optional()?;

        op.ok_or_else(|| Error::OperationNotFound(id.to_string()))
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        match status {
            Some(status) => self.query_operations(
                &format!(
                    "SELECT {COLUMNS} FROM offline_operations
                     WHERE owner_id = ?1 AND sync_status = ?2 {ORDER}"
                ),
                &[&owner_id, &status.as_str()],
            ),
            None => self.query_operations(
                &format!("SELECT {COLUMNS} FROM offline_operations WHERE owner_id = ?1 {ORDER}"),
                &[&owner_id],
            ),
        }
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.query_operations(
            &format!(
                "SELECT {COLUMNS} FROM offline_operations
                 WHERE owner_id = ?1 AND sync_status IN ('pending', 'failed') {ORDER}"
            ),
            &[&owner_id],
        )
    }

    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.mark(id, Mark::Syncing, at)
    }

    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.mark(id, Mark::Synced, at)
    }

    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        self.mark(id, Mark::Failed(error), at)
    }

    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        self.mark(id, Mark::Abandoned(reason), at)
    }

    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM offline_operations
             WHERE owner_id = ?1 AND sync_status = 'synced'
               AND synced_at IS NOT NULL AND synced_at < ?2",
            params![owner_id, fmt_ts(&older_than)],
        )?;
        Ok(deleted)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM offline_operations WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::OperationNotFound(id.to_string()));
        }
        Ok(())
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();

        let mut stmt = self.conn.prepare(
            "SELECT sync_status, COUNT(*) FROM offline_operations
             WHERE owner_id = ?1 AND sync_status != 'synced'
             GROUP BY sync_status",
        )?;
        let rows = stmt
            .query_map(params![owner_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (status, count) in rows {
            let count = usize::try_from(count).unwrap_or(0);
            match status.parse::<SyncStatus>() {
                Ok(SyncStatus::Pending) => counts.pending = count,
                Ok(SyncStatus::Syncing) => counts.syncing = count,
                Ok(SyncStatus::Failed) => counts.failed = count,
                Ok(SyncStatus::Abandoned) => counts.abandoned = count,
                Ok(SyncStatus::Synced) => {}
                Err(_) => warn!(status = %status, "ignoring unknown sync status in counts"),
            }
        }

        let synced: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM offline_operations
             WHERE owner_id = ?1 AND sync_status = 'synced' AND synced_at >= ?2",
            params![owner_id, fmt_ts(&synced_since)],
            |row| row.get(0),
        )?;
        counts.synced_since = usize::try_from(synced).unwrap_or(0);

        Ok(counts)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
