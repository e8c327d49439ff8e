// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OwnerArgs;
use crate::error::Result;
use crate::sync::{ConnectivityMonitor, RemoteSlot};

use super::{runtime, Context};

pub fn run(days: Option<u32>, owner: OwnerArgs) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    let controller = ctx.controller(RemoteSlot::new(), ConnectivityMonitor::new(false))?;

    let deleted = runtime()?.block_on(controller.cleanup(&owner, days))?;
    let days = days.unwrap_or(ctx.config.sync.retention_days);

    println!(
        "Deleted {} synced operation(s) older than {} day(s)",
        deleted, days
    );
    Ok(())
}
