// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Document store backing the remote store of record.
//!
//! Documents are JSON objects addressed by `(collection, key)`. Upserts
//! merge top-level fields into the stored document, so applying the same
//! write twice leaves the store exactly as after the first write.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::db::fmt_ts;
use crate::error::{Error, Result};

/// SQL schema for stored documents.
pub const DOCUMENTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    document TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, key)
);
"#;

/// SQLite-backed collection of JSON documents.
pub struct DocumentStore {
    pub conn: Connection,
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(DOCUMENTS_SCHEMA)?;
        Ok(DocumentStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DOCUMENTS_SCHEMA)?;
        Ok(DocumentStore { conn })
    }

    /// Fetches a document, or `None` if nothing is stored under the key.
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| serde_json::from_str(&s).map_err(Error::from))
            .transpose()
    }

    /// Inserts the document or merges it into the stored one.
    ///
    /// Returns true if the stored content changed. `updated_at` only moves
    /// when it does.
    pub fn upsert(
        &mut self,
        collection: &str,
        key: &str,
        document: Value,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        validate_address(collection, key)?;
        let Value::Object(incoming) = document else {
            return Err(Error::InvalidPayload(format!(
                "document for {collection}/{key} must be a JSON object"
            )));
        };

        let tx = self.conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT document FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        let merged = match existing {
            Some(raw) => {
                let mut stored: Map<String, Value> = match serde_json::from_str(&raw)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                let before = stored.clone();
                stored.extend(incoming);
                if stored == before {
                    return Ok(false);
                }
                stored
            }
            None => incoming,
        };

        tx.execute(
            "INSERT INTO documents (collection, key, document, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, key) DO UPDATE
             SET document = excluded.document, updated_at = excluded.updated_at",
            params![
                collection,
                key,
                serde_json::to_string(&Value::Object(merged))?,
                fmt_ts(&at)
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// When the document last changed.
    pub fn updated_at(&self, collection: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT updated_at FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

fn validate_address(collection: &str, key: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(Error::InvalidInput("collection cannot be empty".to_string()));
    }
    if key.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "document key in {collection} cannot be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
