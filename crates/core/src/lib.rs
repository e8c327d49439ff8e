// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ps-core: Shared library for the possync offline queue
//!
//! This crate provides the operation model, the durable queue tiers, sync
//! statistics and the wire protocol used by both the possync client and the
//! ps-remote store of record.

pub mod clock;
pub mod db;
pub mod documents;
pub mod error;
pub mod fallback;
pub mod id;
pub mod identity;
pub mod operation;
pub mod protocol;
pub mod reopen;
pub mod stats;
pub mod store;
pub mod tiered;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use db::Database;
pub use documents::DocumentStore;
pub use error::{Error, Result};
pub use fallback::FallbackQueue;
pub use operation::{
    NewOperation, OfflineOperation, OperationType, Priority, Provenance, SyncStatus,
    DEFAULT_MAX_RETRIES,
};
pub use reopen::ReopeningStore;
pub use stats::{StatusCounts, SyncStats};
pub use store::QueueStore;
pub use tiered::{Enqueued, Tier, TieredQueue, UnavailableStore};
