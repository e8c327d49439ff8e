// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ps-core operations.

use thiserror::Error;

/// All possible errors that can occur in ps-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("invalid status transition for {id}: cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("invalid operation type: '{0}'\n  hint: valid types are: transaction, customerUpdate, inventoryUpdate, staffAction")]
    InvalidOperationType(String),

    #[error("invalid sync status: '{0}'\n  hint: valid statuses are: pending, syncing, synced, failed, abandoned")]
    InvalidStatus(String),

    #[error("invalid priority: '{0}'\n  hint: priority must be between 1 (highest) and 5 (lowest)")]
    InvalidPriority(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("primary queue unavailable: {0}")]
    PrimaryUnavailable(String),

    #[error("all queue tiers rejected the write: primary: {primary}; fallback: {fallback}")]
    QueueUnavailable { primary: String, fallback: String },
}

/// A specialized Result type for ps-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
