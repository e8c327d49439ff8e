// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate sync statistics.
//!
//! Callers poll these to decide whether to warn an operator about
//! persistent sync trouble; no individual error is pushed anywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw per-status counts for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
    pub abandoned: usize,
    /// Synced rows at or after the requested cutoff.
    pub synced_since: usize,
}

/// Sync health summary for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub synced_today: usize,
    /// Writes still waiting in the local-only fallback tier.
    pub fallback_pending: usize,
    pub total: usize,
    /// `1 - (failed + abandoned) / total`, or 1.0 when there is nothing to report.
    pub health_score: f64,
}

impl SyncStats {
    /// Builds the summary from today's counts.
    pub fn from_counts(counts: StatusCounts, fallback_pending: usize) -> Self {
        let total = counts.pending
            + counts.syncing
            + counts.failed
            + counts.abandoned
            + counts.synced_since;
        let unhealthy = counts.failed + counts.abandoned;
        let health_score = if total == 0 {
            1.0
        } else {
            1.0 - unhealthy as f64 / total as f64
        };

        SyncStats {
            pending: counts.pending,
            syncing: counts.syncing,
            failed: counts.failed,
            abandoned: counts.abandoned,
            synced_today: counts.synced_since,
            fallback_pending,
            total,
            health_score,
        }
    }

    /// Returns true when the health score drops below `threshold`.
    pub fn needs_attention(&self, threshold: f64) -> bool {
        self.health_score < threshold || self.abandoned > 0
    }
}

/// Start of the UTC calendar day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
