// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::{OutputFormat, OwnerArgs};
use crate::error::Result;
use crate::sync::SyncReport;

use super::{disconnect, runtime, Context};

pub fn run(owner: OwnerArgs, output: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    ctx.remote_config()?;

    let report = runtime()?.block_on(sync_once(&ctx, &owner))?;

    match output {
        OutputFormat::Text => println!("{}", describe(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
    }
    Ok(())
}

/// Connects, runs one cycle and disconnects.
async fn sync_once(ctx: &Context, owner: &str) -> Result<SyncReport> {
    let (slot, monitor) = ctx.connect_once().await?;
    let controller = ctx.controller(slot.clone(), monitor)?;
    let report = controller.force_sync(owner).await;
    disconnect(&slot).await;
    report
}

pub(crate) fn describe(report: &SyncReport) -> String {
    let mut line = format!(
        "Synced {}, failed {}, abandoned {}",
        report.synced, report.failed, report.abandoned
    );
    if report.skipped > 0 {
        line.push_str(&format!(" ({} skipped)", report.skipped));
    }
    if report.merged > 0 {
        line.push_str(&format!("; moved {} fallback write(s) into the queue", report.merged));
    }
    line
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
