// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier durable queue.
//!
//! [`TieredQueue`] writes to the primary store and falls back to a
//! local-only store when the primary rejects the write. The fallback is
//! drained back into the primary by [`TieredQueue::merge_fallback`].

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::id::is_local_id;
use crate::operation::{NewOperation, OfflineOperation, SyncStatus};
use crate::stats::StatusCounts;
use crate::store::QueueStore;

/// Which tier accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an enqueued operation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub id: String,
    pub tier: Tier,
}

/// Primary tier that could not be opened.
///
/// Every call fails with the captured open error, so writes are routed to
/// the fallback tier and reads report why the primary is missing.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableStore {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> Result<T> {
        Err(Error::PrimaryUnavailable(self.reason.clone()))
    }
}

impl QueueStore for UnavailableStore {
    fn enqueue(&mut self, _op: NewOperation) -> Result<String> {
        self.err()
    }

    fn get(&self, _id: &str) -> Result<OfflineOperation> {
        self.err()
    }

    fn list(&self, _owner_id: &str, _status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        self.err()
    }

    fn list_drainable(&self, _owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.err()
    }

    fn mark_syncing(&mut self, _id: &str, _at: DateTime<Utc>) -> Result<()> {
        self.err()
    }

    fn mark_synced(&mut self, _id: &str, _at: DateTime<Utc>) -> Result<()> {
        self.err()
    }

    fn mark_failed(&mut self, _id: &str, _error: &str, _at: DateTime<Utc>) -> Result<()> {
        self.err()
    }

    fn mark_abandoned(&mut self, _id: &str, _reason: &str, _at: DateTime<Utc>) -> Result<()> {
        self.err()
    }

    fn purge(&mut self, _owner_id: &str, _older_than: DateTime<Utc>) -> Result<usize> {
        self.err()
    }

    fn remove(&mut self, _id: &str) -> Result<()> {
        self.err()
    }

    fn ensure_available(&mut self) -> Result<()> {
        self.err()
    }

    fn counts(&self, _owner_id: &str, _synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        self.err()
    }
}

/// Primary store with a local-only fallback for writes.
pub struct TieredQueue<P, F> {
    primary: P,
    fallback: F,
}

impl<P: QueueStore, F: QueueStore> TieredQueue<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        TieredQueue { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    pub fn fallback_mut(&mut self) -> &mut F {
        &mut self.fallback
    }

    /// Stores the operation in the first tier that accepts it.
    ///
    /// Invalid input is rejected without touching the fallback.
    pub fn enqueue(&mut self, op: NewOperation) -> Result<Enqueued> {
        op.validate()?;

        if let Err(e) = self.primary.ensure_available() {
            debug!(error = %e, "primary still unavailable");
        }
        let primary_err = match self.primary.enqueue(op.clone()) {
            Ok(id) => {
                return Ok(Enqueued {
                    id,
                    tier: Tier::Primary,
                })
            }
            Err(e) => e,
        };

        warn!(
            owner = %op.owner_id,
            error = %primary_err,
            "primary queue rejected write, using fallback"
        );

        match self.fallback.enqueue(op) {
            Ok(id) => Ok(Enqueued {
                id,
                tier: Tier::Fallback,
            }),
            Err(fallback_err) => Err(Error::QueueUnavailable {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }

    /// Moves an owner's fallback records into the primary tier.
    ///
    /// Each record is re-enqueued as a fresh `pending` operation that keeps
    /// its payload, priority, creation time and provenance, and only then
    /// removed from the fallback. A record the primary rejects stays in the
    /// fallback. A record that could not be removed after merging stays too
    /// and is merged again later; replay is an idempotent upsert, so the
    /// duplicate converges. Returns how many records moved.
    pub fn merge_fallback(&mut self, owner_id: &str) -> Result<usize> {
        let records = self.fallback.list(owner_id, None)?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut merged = 0;
        let mut first_err = None;
        for record in records {
            match self.primary.enqueue(record.to_new()) {
                Ok(id) => {
                    debug!(from = %record.id, to = %id, "merged fallback record");
                    merged += 1;
                    if let Err(e) = self.fallback.remove(&record.id) {
                        warn!(
                            id = %record.id,
                            error = %e,
                            "merged record left in fallback, it will be merged again"
                        );
                    }
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "primary rejected fallback record");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) if merged == 0 => Err(e),
            _ => Ok(merged),
        }
    }

    /// Gives a closed primary the chance to come back.
    pub fn ensure_primary(&mut self) -> Result<()> {
        self.primary.ensure_available()
    }

    /// Number of the owner's writes waiting in the fallback tier.
    pub fn fallback_len(&self, owner_id: &str) -> Result<usize> {
        Ok(self.fallback.list(owner_id, None)?.len())
    }
}

impl<P: QueueStore, F: QueueStore> QueueStore for TieredQueue<P, F> {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        TieredQueue::enqueue(self, op).map(|enqueued| enqueued.id)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        if is_local_id(id) {
            return self.fallback.get(id);
        }
        self.primary.get(id)
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        self.primary.list(owner_id, status)
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.primary.list_drainable(owner_id)
    }

    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.primary.mark_syncing(id, at)
    }

    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.primary.mark_synced(id, at)
    }

    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        self.primary.mark_failed(id, error, at)
    }

    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        self.primary.mark_abandoned(id, reason, at)
    }

    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        self.primary.purge(owner_id, older_than)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        if is_local_id(id) {
            return self.fallback.remove(id);
        }
        self.primary.remove(id)
    }

    fn ensure_available(&mut self) -> Result<()> {
        self.ensure_primary()
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        self.primary.counts(owner_id, synced_since)
    }
}

#[cfg(test)]
#[path = "tiered_tests.rs"]
mod tests;
