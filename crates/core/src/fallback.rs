// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local-only fallback tier.
//!
//! Writes land here when the primary queue cannot accept them. Records are
//! kept as JSON lines, one operation per line. Enqueue appends and fsyncs;
//! every other mutation rewrites the file through a temporary sibling and
//! renames it into place.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{Error, Result};
use crate::id::generate_local_id;
use crate::operation::{NewOperation, OfflineOperation, SyncStatus};
use crate::stats::StatusCounts;
use crate::store::{apply_mark, Mark, QueueStore};

/// JSONL-backed queue used when the primary tier is unavailable.
pub struct FallbackQueue {
    path: PathBuf,
}

impl FallbackQueue {
    /// Open the fallback queue at `path`, creating the file if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(path)?;

        Ok(FallbackQueue {
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records held for `owner_id`.
    pub fn len_for(&self, owner_id: &str) -> Result<usize> {
        Ok(self
            .read_records()?
            .iter()
            .filter(|op| op.owner_id == owner_id)
            .count())
    }

    fn read_records(&self) -> Result<Vec<OfflineOperation>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OfflineOperation>(&line) {
                Ok(op) => records.push(op),
                // A torn final write must not hide every other record
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping undecodable fallback record"
                ),
            }
        }
        Ok(records)
    }

    fn write_records(&self, records: &[OfflineOperation]) -> Result<()> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn owned_sorted(
        &self,
        owner_id: &str,
        keep: impl Fn(&OfflineOperation) -> bool,
    ) -> Result<Vec<OfflineOperation>> {
        let mut ops: Vec<_> = self
            .read_records()?
            .into_iter()
            .filter(|op| op.owner_id == owner_id && keep(op))
            .collect();
        ops.sort_by(OfflineOperation::drain_order);
        Ok(ops)
    }

    fn mark(&mut self, id: &str, mark: Mark<'_>, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.read_records()?;
        let record = records
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or_else(|| Error::OperationNotFound(id.to_string()))?;
        apply_mark(record, mark, at)?;
        self.write_records(&records)
    }
}

impl QueueStore for FallbackQueue {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        op.validate()?;

        let id = generate_local_id(&op.owner_id, &op.created_at);
        let record = op.into_operation(id.clone());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
        file.sync_all()?;

        Ok(id)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        self.read_records()?
            .into_iter()
            .find(|op| op.id == id)
            .ok_or_else(|| Error::OperationNotFound(id.to_string()))
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        self.owned_sorted(owner_id, |op| {
            status.is_none() || status == Some(op.sync_status)
        })
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.owned_sorted(owner_id, |op| op.sync_status.is_drainable())
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
        let records = self.read_records()?;
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|op| {
                !(op.owner_id == owner_id
                    && op.sync_status == SyncStatus::Synced
                    && op.synced_at.is_some_and(|at| at < older_than))
            })
            .collect();

        let deleted = before - kept.len();
        if deleted > 0 {
            self.write_records(&kept)?;
        }
        Ok(deleted)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let records = self.read_records()?;
        let before = records.len();
        let kept: Vec<_> = records.into_iter().filter(|op| op.id != id).collect();
        if kept.len() == before {
            return Err(Error::OperationNotFound(id.to_string()));
        }
        self.write_records(&kept)
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for op in self.read_records()? {
            if op.owner_id != owner_id {
                continue;
            }
            match op.sync_status {
                SyncStatus::Pending => counts.pending += 1,
                SyncStatus::Syncing => counts.syncing += 1,
                SyncStatus::Failed => counts.failed += 1,
                SyncStatus::Abandoned => counts.abandoned += 1,
                SyncStatus::Synced => {
                    if op.synced_at.is_some_and(|at| at >= synced_since) {
                        counts.synced_since += 1;
                    }
                }
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[path = "fallback_tests.rs"]
mod tests;
