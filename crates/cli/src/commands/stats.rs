// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use ps_core::SyncStats;

use crate::cli::{OutputFormat, OwnerArgs};
use crate::error::Result;
use crate::sync::{ConnectivityMonitor, RemoteSlot};

use super::{runtime, Context};

/// Below this health score the text output carries a warning.
const ATTENTION_THRESHOLD: f64 = 0.8;

pub fn run(owner: OwnerArgs, output: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    let controller = ctx.controller(RemoteSlot::new(), ConnectivityMonitor::new(false))?;

    let stats = runtime()?.block_on(controller.stats(&owner))?;

    match output {
        OutputFormat::Text => print!("{}", format_stats(&stats)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&stats)?),
    }
    Ok(())
}

pub(crate) fn format_stats(stats: &SyncStats) -> String {
    let mut out = format!(
        "pending:      {}\n\
         syncing:      {}\n\
         failed:       {}\n\
         abandoned:    {}\n\
         synced today: {}\n\
         fallback:     {}\n\
         health:       {:.0}%\n",
        stats.pending,
        stats.syncing,
        stats.failed,
        stats.abandoned,
        stats.synced_today,
        stats.fallback_pending,
        stats.health_score * 100.0
    );
    if stats.needs_attention(ATTENTION_THRESHOLD) {
        out.push_str("warning: sync needs attention; see 'possync list --status failed' and '--status abandoned'\n");
    }
    out
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
