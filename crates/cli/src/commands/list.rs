// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use ps_core::{OfflineOperation, QueueStore, SyncStatus};

use crate::cli::{OutputFormat, OwnerArgs};
use crate::error::Result;

use super::Context;

/// JSON output structure for the list command.
#[derive(Serialize)]
struct ListOutputJson<'a> {
    owner: &'a str,
    operations: &'a [OfflineOperation],
    fallback_pending: usize,
}

pub fn run(status: Option<SyncStatus>, owner: OwnerArgs, output: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    let queue = ctx.open_queue()?;

    let operations = queue.list(&owner, status)?;
    let fallback_pending = queue.fallback_len(&owner)?;

    match output {
        OutputFormat::Text => {
            if operations.is_empty() {
                println!("No operations");
            }
            for op in &operations {
                println!("{}", format_operation_line(op));
            }
            if fallback_pending > 0 {
                println!(
                    "{} write(s) waiting in the fallback file; they join the queue on the next sync",
                    fallback_pending
                );
            }
        }
        OutputFormat::Json => {
            let json = ListOutputJson {
                owner: &owner,
                operations: &operations,
                fallback_pending,
            };
            println!("{}", serde_json::to_string(&json)?);
        }
    }
    Ok(())
}

/// One line per operation: id, status, priority, type, attempts, age, error.
pub(crate) fn format_operation_line(op: &OfflineOperation) -> String {
    let mut line = format!(
        "{:<8} {:<9} p{} {:<15} {}/{} {}",
        op.id,
        op.sync_status,
        op.priority,
        op.operation_type,
        op.retry_count,
        op.max_retries,
        op.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(error) = &op.error_message {
        line.push_str("  ");
        line.push_str(error);
    }
    line
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
