// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The queue storage interface shared by every tier.
//!
//! All queries are scoped by owner. Status changes go through
//! [`apply_mark`] so every tier enforces the same lifecycle rules.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::operation::{NewOperation, OfflineOperation, SyncStatus};
use crate::stats::StatusCounts;

/// Owner-scoped durable storage for queued operations.
pub trait QueueStore: Send {
    /// Stores a new operation in `pending` state and returns its id.
    fn enqueue(&mut self, op: NewOperation) -> Result<String>;

    /// Fetches one operation by id.
    fn get(&self, id: &str) -> Result<OfflineOperation>;

    /// Lists an owner's operations, optionally filtered by status, in drain order.
    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>>;

    /// Lists an owner's `pending` and `failed` operations in drain order.
    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>>;

    /// `pending | failed -> syncing`; stamps `last_attempt_at`.
    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// `syncing -> synced`; stamps `synced_at` and clears any error.
    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// `syncing -> failed`; records the error and bumps `retry_count`.
    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()>;

    /// `pending | failed -> abandoned`; records why.
    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()>;

    /// Deletes the owner's `synced` operations whose `synced_at` is before
    /// `older_than`. Returns how many were deleted.
    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize>;

    /// Deletes one operation regardless of status.
    fn remove(&mut self, id: &str) -> Result<()>;

    /// Re-establishes a store that lost its backing storage.
    ///
    /// Stores that cannot lose their storage have nothing to do.
    fn ensure_available(&mut self) -> Result<()> {
        Ok(())
    }

    /// Per-status counts for an owner; `synced` counts only rows synced at
    /// or after `synced_since`.
    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts>;
}

impl<T: QueueStore + ?Sized> QueueStore for Box<T> {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        (**self).enqueue(op)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        (**self).get(id)
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        (**self).list(owner_id, status)
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        (**self).list_drainable(owner_id)
    }

    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_syncing(id, at)
    }

    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_synced(id, at)
    }

    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_failed(id, error, at)
    }

    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_abandoned(id, reason, at)
    }

    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        (**self).purge(owner_id, older_than)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        (**self).remove(id)
    }

    fn ensure_available(&mut self) -> Result<()> {
        (**self).ensure_available()
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        (**self).counts(owner_id, synced_since)
    }
}

/// A status change requested on a stored record.
#[derive(Debug, Clone, Copy)]
pub enum Mark<'a> {
    Syncing,
    Synced,
    Failed(&'a str),
    Abandoned(&'a str),
}

/// Applies a status change to a record in place, validating the transition
/// and stamping the matching fields.
pub fn apply_mark(record: &mut OfflineOperation, mark: Mark<'_>, at: DateTime<Utc>) -> Result<()> {
    match mark {
        Mark::Syncing => {
            record.transition(SyncStatus::Syncing)?;
            record.last_attempt_at = Some(at);
        }
        Mark::Synced => {
            record.transition(SyncStatus::Synced)?;
            record.synced_at = Some(at);
            record.error_message = None;
        }
        Mark::Failed(error) => {
            record.transition(SyncStatus::Failed)?;
            record.retry_count = record.retry_count.saturating_add(1);
            record.last_attempt_at = Some(at);
            record.error_message = Some(error.to_string());
        }
        Mark::Abandoned(reason) => {
            record.transition(SyncStatus::Abandoned)?;
            record.error_message = Some(reason.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
