// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Primary tier that survives a database it could not open.
//!
//! [`ReopeningStore`] remembers the database path. While the database is
//! closed every call fails with [`Error::PrimaryUnavailable`], and the next
//! write or [`QueueStore::ensure_available`] tries to open it again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::operation::{NewOperation, OfflineOperation, SyncStatus};
use crate::stats::StatusCounts;
use crate::store::QueueStore;

pub struct ReopeningStore {
    path: PathBuf,
    db: Option<Database>,
    /// Why the last open failed.
    reason: String,
}

impl ReopeningStore {
    /// Opens the database at `path`, staying closed if that fails.
    pub fn open(path: &Path) -> Self {
        let mut store = ReopeningStore {
            path: path.to_path_buf(),
            db: None,
            reason: String::new(),
        };
        if let Err(e) = store.try_open() {
            warn!(path = %path.display(), error = %e, "queue database unavailable, writes go to the fallback file");
        }
        store
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_open(&mut self) -> Result<()> {
        match Database::open(&self.path) {
            Ok(db) => {
                self.db = Some(db);
                self.reason.clear();
                Ok(())
            }
            Err(e) => {
                self.reason = e.to_string();
                Err(Error::PrimaryUnavailable(self.reason.clone()))
            }
        }
    }

    fn db(&self) -> Result<&Database> {
        self.db
            .as_ref()
            .ok_or_else(|| Error::PrimaryUnavailable(self.reason.clone()))
    }

    fn db_mut(&mut self) -> Result<&mut Database> {
        self.ensure_available()?;
        self.db
            .as_mut()
            .ok_or_else(|| Error::PrimaryUnavailable(self.reason.clone()))
    }
}

impl QueueStore for ReopeningStore {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        self.db_mut()?.enqueue(op)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        self.db()?.get(id)
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        self.db()?.list(owner_id, status)
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.db()?.list_drainable(owner_id)
    }

    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.db_mut()?.mark_syncing(id, at)
    }

    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.db_mut()?.mark_synced(id, at)
    }

    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        self.db_mut()?.mark_failed(id, error, at)
    }

    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        self.db_mut()?.mark_abandoned(id, reason, at)
    }

    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        self.db_mut()?.purge(owner_id, older_than)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        self.db_mut()?.remove(id)
    }

    fn ensure_available(&mut self) -> Result<()> {
        if self.db.is_some() {
            return Ok(());
        }
        self.try_open()?;
        info!(path = %self.path.display(), "queue database reopened");
        Ok(())
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        self.db()?.counts(owner_id, synced_since)
    }
}

#[cfg(test)]
#[path = "reopen_tests.rs"]
mod tests;
