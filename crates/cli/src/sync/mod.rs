// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Draining the offline queue into the store of record.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Controller  │────►│   Executor   │────►│ RemoteStore  │
//! │   (cycles)   │     │ (op -> doc)  │     │   (trait)    │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!     │      ▲                                     ▲
//!     ▼      │ edges                               │ slot
//! ┌────────┐ ┌──────────────┐              ┌──────────────┐
//! │ Queue  │ │ Connectivity │◄─────────────│     Link     │
//! │(tiered)│ │   Monitor    │   online?    │ (reconnect)  │
//! └────────┘ └──────────────┘              └──────────────┘
//! ```
//!
//! - Cycles drain one owner's queue in priority order
//! - Coming online triggers a cycle and arms the interval timer
//! - The link supervisor reconnects with exponential backoff
//! - The remote is a trait so tests run against memory

mod connectivity;
mod controller;
mod executor;
mod link;
mod remote;

pub use connectivity::{ConnectivityEvent, ConnectivityEvents, ConnectivityMonitor};
pub use controller::{
    ControllerHandle, SharedQueue, SubmitOutcome, SyncController, SyncReport, SyncSettings,
    DEFAULT_RETENTION_DAYS, DEFAULT_SYNC_INTERVAL,
};
pub use executor::{
    plan, ApplyError, ApplyOutcome, OperationExecutor, Plan, Upsert, CUSTOMERS, INVENTORY,
    STAFF_ROLES, STAFF_SHIFTS, TRANSACTIONS,
};
pub use link::{LinkConfig, LinkState, LinkSupervisor};
pub use remote::{RemoteError, RemoteFuture, RemoteResult, RemoteSlot, RemoteStore, WebSocketRemote};

#[cfg(test)]
mod test_helpers;
