// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! possync - offline operation queue for point-of-sale terminals.
//!
//! This crate provides the `possync` CLI and the sync machinery behind it:
//! operations are captured into a durable local queue while the store of
//! record is unreachable and replayed, in priority order, when it comes back.
//!
//! # Main Components
//!
//! - [`sync::SyncController`] - Drains the queue on reconnect, on an interval and on demand
//! - [`sync::OperationExecutor`] - Maps each operation to an idempotent upsert
//! - [`sync::ConnectivityMonitor`] - Online/offline edges
//! - [`Config`] - Project configuration (`.possync/config.toml`)
//! - [`Error`] - Error types for all operations
//!
//! # Embedding
//!
//! ```rust,ignore
//! use possync::sync::{ConnectivityMonitor, OperationExecutor, SyncController, SyncSettings};
//!
//! let controller = SyncController::new(queue, OperationExecutor::new(remote), monitor, SyncSettings::default());
//! let handle = Arc::new(controller).start("store-12");
//! // platform adapter calls monitor.set_online(..) on reachability changes
//! handle.shutdown().await;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, OwnerArgs};
pub use config::{find_work_dir, init_work_dir, Config, RemoteConfig, SyncConfig};
pub use error::{Error, Result};

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Init {
            owner,
            remote,
            path,
        } => commands::init::run(owner, remote, path),
        Command::Enqueue {
            operation_type,
            payload,
            priority,
            max_retries,
            apply,
            owner,
            output,
        } => commands::enqueue::run(
            operation_type,
            payload,
            priority,
            max_retries,
            apply,
            owner,
            output,
        ),
        Command::List {
            status,
            owner,
            output,
        } => commands::list::run(status, owner, output),
        Command::Sync { owner, output } => commands::sync::run(owner, output),
        Command::Cleanup { days, owner } => commands::cleanup::run(days, owner),
        Command::Stats { owner, output } => commands::stats::run(owner, output),
        Command::Run { owner } => commands::run::run(owner),
    }
}
