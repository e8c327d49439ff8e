// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core operation types for the offline sync queue.
//!
//! An [`OfflineOperation`] is a unit of deferred work captured by a
//! point-of-sale client: a sale, a customer edit, a stock adjustment or a
//! staff action. Operations are owner-scoped, carry an opaque JSON payload,
//! and move through the [`SyncStatus`] lifecycle as the sync controller
//! drains them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default number of failed attempts before an operation is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Kind of deferred work, which decides how the operation is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    /// A completed sale or refund.
    Transaction,
    /// A change to a customer record.
    CustomerUpdate,
    /// A stock level or catalogue change.
    InventoryUpdate,
    /// A staff clock-in, clock-out or role change.
    StaffAction,
}

impl OperationType {
    /// All operation types, in declaration order.
    pub const ALL: [OperationType; 4] = [
        OperationType::Transaction,
        OperationType::CustomerUpdate,
        OperationType::InventoryUpdate,
        OperationType::StaffAction,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Transaction => "transaction",
            OperationType::CustomerUpdate => "customerUpdate",
            OperationType::InventoryUpdate => "inventoryUpdate",
            OperationType::StaffAction => "staffAction",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    /// Accepts the canonical camelCase spelling as well as snake_case and
    /// kebab-case variants typed on a command line.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "transaction" => Ok(OperationType::Transaction),
            "customerupdate" => Ok(OperationType::CustomerUpdate),
            "inventoryupdate" => Ok(OperationType::InventoryUpdate),
            "staffaction" => Ok(OperationType::StaffAction),
            _ => Err(Error::InvalidOperationType(s.to_string())),
        }
    }
}

/// Lifecycle state of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Waiting for its first attempt.
    Pending,
    /// Currently being applied by a sync cycle.
    Syncing,
    /// Applied to the remote store. Terminal.
    Synced,
    /// Last attempt failed; eligible for retry on the next cycle.
    Failed,
    /// Retry budget exhausted; kept for manual intervention. Terminal.
    Abandoned,
}

impl SyncStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Abandoned => "abandoned",
        }
    }

    /// Check if a transition from this status to target is valid.
    ///
    /// `synced` and `abandoned` never move again; `failed` may re-enter
    /// `syncing` for a retry.
    pub fn can_transition_to(&self, target: SyncStatus) -> bool {
        use SyncStatus::*;
        matches!(
            (self, target),
            (Pending, Syncing)
                | (Pending, Abandoned)
                | (Failed, Syncing)
                | (Failed, Abandoned)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Syncing, Abandoned)
        )
    }

    /// Returns true if a drain cycle should pick this operation up.
    pub fn is_drainable(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }

    /// Returns true if the operation can never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Abandoned)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "syncing" => Ok(SyncStatus::Syncing),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            "abandoned" => Ok(SyncStatus::Abandoned),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Drain priority, 1 (highest) to 5 (lowest).
///
/// Ordering follows the numeric value, so sorting ascending yields the
/// highest-priority operations first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority.
    pub const HIGHEST: Priority = Priority(1);
    /// Priority used when the caller does not pick one.
    pub const DEFAULT: Priority = Priority(3);
    /// Least urgent priority.
    pub const LOWEST: Priority = Priority(5);

    /// Creates a priority, validating the 1..=5 range.
    pub fn new(value: u8) -> Result<Self> {
        if (Self::HIGHEST.0..=Self::LOWEST.0).contains(&value) {
            Ok(Priority(value))
        } else {
            Err(Error::InvalidPriority(value.to_string()))
        }
    }

    /// Returns the numeric priority.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

impl TryFrom<u8> for Priority {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Priority::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::InvalidPriority(s.to_string()))?;
        Priority::new(value)
    }
}

/// Where an operation was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Stable per installed client.
    pub device_id: String,
    /// Stable per process run.
    pub session_id: String,
}

impl Provenance {
    /// Creates a provenance tag.
    pub fn new(device_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Provenance {
            device_id: device_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// An operation that has not been stored yet.
///
/// Stores assign the id when they accept the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    pub owner_id: String,
    pub operation_type: OperationType,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_sync_at: Option<DateTime<Utc>>,
    pub provenance: Provenance,
}

impl NewOperation {
    /// Creates a new operation with default priority and retry budget.
    pub fn new(
        owner_id: impl Into<String>,
        operation_type: OperationType,
        payload: serde_json::Value,
        provenance: Provenance,
        created_at: DateTime<Utc>,
    ) -> Self {
        NewOperation {
            owner_id: owner_id.into(),
            operation_type,
            payload,
            priority: Priority::DEFAULT,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at,
            scheduled_sync_at: None,
            provenance,
        }
    }

    /// Sets the drain priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Records when the caller expects the operation to be synced.
    pub fn with_scheduled_sync_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_sync_at = Some(at);
        self
    }

    /// Checks the fields every store relies on.
    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(Error::InvalidInput("owner id cannot be empty".to_string()));
        }
        if !self.payload.is_object() {
            return Err(Error::InvalidPayload(format!(
                "{} payload must be a JSON object",
                self.operation_type
            )));
        }
        Ok(())
    }

    /// Materializes the stored record under the given id.
    pub fn into_operation(self, id: String) -> OfflineOperation {
        OfflineOperation {
            id,
            owner_id: self.owner_id,
            operation_type: self.operation_type,
            payload: self.payload,
            priority: self.priority,
            sync_status: SyncStatus::Pending,
            retry_count: 0,
            max_retries: self.max_retries,
            created_at: self.created_at,
            scheduled_sync_at: self.scheduled_sync_at,
            last_attempt_at: None,
            synced_at: None,
            error_message: None,
            device_id: self.provenance.device_id,
            session_id: self.provenance.session_id,
        }
    }
}

/// A queued unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineOperation {
    pub id: String,
    pub owner_id: String,
    pub operation_type: OperationType,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub sync_status: SyncStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_sync_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub device_id: String,
    pub session_id: String,
}

impl OfflineOperation {
    /// Returns true once the retry budget is spent.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Drain order: priority first, then age, then id for a stable tiebreak.
    pub fn drain_order(a: &OfflineOperation, b: &OfflineOperation) -> std::cmp::Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Moves the record to `target`, validating the transition.
    pub fn transition(&mut self, target: SyncStatus) -> Result<()> {
        if !self.sync_status.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                id: self.id.clone(),
                from: self.sync_status.to_string(),
                to: target.to_string(),
            });
        }
        self.sync_status = target;
        Ok(())
    }

    /// Converts a stored record back into an unstored one.
    ///
    /// Used when a record moves between queue tiers: status and attempt
    /// history are dropped, everything the caller supplied is kept.
    pub fn to_new(&self) -> NewOperation {
        NewOperation {
            owner_id: self.owner_id.clone(),
            operation_type: self.operation_type,
            payload: self.payload.clone(),
            priority: self.priority,
            max_retries: self.max_retries,
            created_at: self.created_at,
            scheduled_sync_at: self.scheduled_sync_at,
            provenance: Provenance::new(self.device_id.clone(), self.session_id.clone()),
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
