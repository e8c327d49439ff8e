// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cleanup;
pub mod enqueue;
pub mod init;
pub mod list;
pub mod run;
pub mod stats;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use ps_core::{FallbackQueue, QueueStore, ReopeningStore, TieredQueue};

use crate::cli::OwnerArgs;
use crate::config::{fallback_path, find_work_dir, queue_db_path, Config, RemoteConfig};
use crate::error::{Error, Result};
use crate::sync::{
    ConnectivityMonitor, OperationExecutor, RemoteSlot, RemoteStore, SyncController,
    WebSocketRemote,
};

/// The on-disk queue: SQLite primary with a JSONL fallback.
pub type LocalQueue = TieredQueue<Box<dyn QueueStore>, FallbackQueue>;

/// Controller over the on-disk queue.
pub type LocalController<R> = SyncController<Box<dyn QueueStore>, FallbackQueue, R>;

/// Opens both queue tiers.
///
/// A primary database that cannot be opened rejects every call, so writes
/// land in the fallback file, and is retried on the next write or cycle.
pub fn open_queue(work_dir: &Path) -> Result<LocalQueue> {
    let primary: Box<dyn QueueStore> = Box::new(ReopeningStore::open(&queue_db_path(work_dir)));
    let fallback = FallbackQueue::open(&fallback_path(work_dir))?;
    Ok(TieredQueue::new(primary, fallback))
}

/// Work directory and configuration for the current invocation.
pub struct Context {
    pub work_dir: PathBuf,
    pub config: Config,
}

impl Context {
    /// Finds `.possync/` from the current directory and loads its config.
    pub fn load() -> Result<Self> {
        let work_dir = find_work_dir()?;
        let config = Config::load(&work_dir)?;
        Ok(Context { work_dir, config })
    }

    pub fn owner(&self, args: OwnerArgs) -> Result<String> {
        self.config.resolve_owner(args.owner)
    }

    pub fn open_queue(&self) -> Result<LocalQueue> {
        open_queue(&self.work_dir)
    }

    pub fn remote_config(&self) -> Result<&RemoteConfig> {
        self.config.remote.as_ref().ok_or(Error::NoRemote)
    }

    /// Builds a controller over the on-disk queue.
    pub fn controller<R: RemoteStore + 'static>(
        &self,
        remote: R,
        monitor: ConnectivityMonitor,
    ) -> Result<LocalController<R>> {
        let queue = Arc::new(Mutex::new(self.open_queue()?));
        Ok(SyncController::new(
            queue,
            OperationExecutor::new(remote),
            monitor,
            self.config.sync.settings(),
        ))
    }

    /// Makes one connection attempt to the store of record.
    ///
    /// Returns the slot (empty on failure) and a monitor reflecting the
    /// outcome. Unreachable is not an error here; the controller decides.
    pub async fn connect_once(&self) -> Result<(RemoteSlot, ConnectivityMonitor)> {
        let remote = self.remote_config()?;
        let slot = RemoteSlot::new();
        let monitor = ConnectivityMonitor::new(false);
        match WebSocketRemote::connect(&remote.url, remote.request_timeout()).await {
            Ok(connection) => {
                slot.set(Arc::new(connection)).await;
                monitor.set_online(true);
            }
            Err(e) => warn!(url = %remote.url, error = %e, "store of record unreachable"),
        }
        Ok((slot, monitor))
    }
}

/// Closes the slot's connection, if any.
pub async fn disconnect(slot: &RemoteSlot) {
    if let Some(remote) = slot.clear().await {
        remote.close().await;
        debug!("disconnected from store of record");
    }
}

/// Runtime for one-shot async commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
