// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync: keep the link up and drain on every reconnect.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::OwnerArgs;
use crate::error::{Error, Result};
use crate::sync::{ConnectivityMonitor, LinkSupervisor, RemoteSlot};

use super::Context;

pub fn run(owner: OwnerArgs) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    let link_config = ctx.remote_config()?.link_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let slot = RemoteSlot::new();
        let monitor = ConnectivityMonitor::new(false);
        let controller = Arc::new(ctx.controller(slot.clone(), monitor.clone())?);

        if let Err(e) = controller.cleanup(&owner, None).await {
            warn!(error = %e, "startup cleanup failed");
        }

        let handle = controller.start(owner.clone());
        let link = LinkSupervisor::spawn(link_config, slot, monitor);
        info!(owner = %owner, "possync running; press Ctrl-C to stop");

        let stopped = tokio::signal::ctrl_c().await;

        info!("shutting down");
        link.shutdown().await;
        handle.shutdown().await;
        stopped?;
        Ok::<_, Error>(())
    })
}
