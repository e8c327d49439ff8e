// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replays queued operations against the store of record.
//!
//! Each [`OperationType`] maps to one collection and one key field. Staff
//! actions carry an `actionType` sub-type that picks the collection and
//! reshapes the document.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use ps_core::{OfflineOperation, OperationType};

use super::remote::{RemoteError, RemoteStore};

pub const TRANSACTIONS: &str = "transactions";
pub const CUSTOMERS: &str = "customers";
pub const INVENTORY: &str = "inventory";
pub const STAFF_SHIFTS: &str = "staff_shifts";
pub const STAFF_ROLES: &str = "staff_roles";

/// Result of applying one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The store of record holds the operation's effect.
    Applied,
    /// Nothing to apply; the operation is done.
    Skipped { reason: String },
}

/// Why an operation could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// One idempotent write to the store of record.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub collection: &'static str,
    pub key: String,
    pub document: Value,
}

/// What to do for an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Upsert(Upsert),
    Skip(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "actionType", rename_all = "camelCase")]
enum StaffAction {
    #[serde(rename_all = "camelCase")]
    ClockIn {
        staff_id: String,
        shift_id: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    ClockOut {
        staff_id: String,
        shift_id: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    RoleAssignment { staff_id: String, role: String },
    #[serde(other)]
    Unknown,
}

/// Turns an operation into the write it stands for.
///
/// Pure; two calls on the same operation yield the same plan.
pub fn plan(op: &OfflineOperation) -> Result<Plan, ApplyError> {
    let Value::Object(payload) = &op.payload else {
        return Err(ApplyError::InvalidPayload(format!(
            "{} payload must be a JSON object",
            op.operation_type
        )));
    };

    let (collection, key, mut document) = match op.operation_type {
        OperationType::Transaction => (TRANSACTIONS, required_key(payload, "id")?, payload.clone()),
        OperationType::CustomerUpdate => (CUSTOMERS, required_key(payload, "id")?, payload.clone()),
        OperationType::InventoryUpdate => (INVENTORY, required_key(payload, "id")?, payload.clone()),
        OperationType::StaffAction => match staff_action(&op.payload)? {
            StaffAction::ClockIn {
                staff_id,
                shift_id,
                at,
            } => {
                let mut doc = Map::new();
                doc.insert("shiftId".into(), Value::String(shift_id.clone()));
                doc.insert("staffId".into(), Value::String(staff_id));
                doc.insert("clockInAt".into(), timestamp(at.unwrap_or(op.created_at)));
                (STAFF_SHIFTS, shift_id, doc)
            }
            StaffAction::ClockOut {
                staff_id,
                shift_id,
                at,
            } => {
                let mut doc = Map::new();
                doc.insert("shiftId".into(), Value::String(shift_id.clone()));
                doc.insert("staffId".into(), Value::String(staff_id));
                doc.insert("clockOutAt".into(), timestamp(at.unwrap_or(op.created_at)));
                (STAFF_SHIFTS, shift_id, doc)
            }
            StaffAction::RoleAssignment { staff_id, role } => {
                let mut doc = Map::new();
                doc.insert("staffId".into(), Value::String(staff_id.clone()));
                doc.insert("role".into(), Value::String(role));
                (STAFF_ROLES, staff_id, doc)
            }
            StaffAction::Unknown => {
                let action = payload
                    .get("actionType")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                return Ok(Plan::Skip(format!("unrecognized staff action '{action}'")));
            }
        },
    };

    document.insert("ownerId".into(), Value::String(op.owner_id.clone()));
    Ok(Plan::Upsert(Upsert {
        collection,
        key,
        document: Value::Object(document),
    }))
}

fn staff_action(payload: &Value) -> Result<StaffAction, ApplyError> {
    StaffAction::deserialize(payload)
        .map_err(|e| ApplyError::InvalidPayload(format!("staff action: {e}")))
}

/// Reads a key field; strings and integers are accepted.
fn required_key(payload: &Map<String, Value>, field: &str) -> Result<String, ApplyError> {
    let key = match payload.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
        Some(_) => {
            return Err(ApplyError::InvalidPayload(format!(
                "'{field}' must be a string or integer"
            )))
        }
        None => return Err(ApplyError::InvalidPayload(format!("missing '{field}'"))),
    };
    if key.is_empty() {
        return Err(ApplyError::InvalidPayload(format!("'{field}' is empty")));
    }
    Ok(key)
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

/// Applies operations to a [`RemoteStore`].
pub struct OperationExecutor<R> {
    remote: R,
}

impl<R: RemoteStore> OperationExecutor<R> {
    pub fn new(remote: R) -> Self {
        OperationExecutor { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Replays one operation. Safe to call again for the same operation.
    pub async fn apply(&self, op: &OfflineOperation) -> Result<ApplyOutcome, ApplyError> {
        match plan(op)? {
            Plan::Upsert(Upsert {
                collection,
                key,
                document,
            }) => {
                debug!(id = %op.id, collection, key = %key, "applying operation");
                self.remote.upsert(collection, &key, document).await?;
                Ok(ApplyOutcome::Applied)
            }
            Plan::Skip(reason) => {
                warn!(id = %op.id, reason = %reason, "skipping operation");
                Ok(ApplyOutcome::Skipped { reason })
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
