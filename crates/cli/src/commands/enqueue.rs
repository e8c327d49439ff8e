// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use ps_core::identity::{current_provenance, new_session_id};
use ps_core::{NewOperation, OperationType, Priority, Provenance};

use crate::cli::{OutputFormat, OwnerArgs};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::sync::SubmitOutcome;

use super::{disconnect, runtime, Context};

/// JSON output for the enqueue command.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum EnqueueJson {
    Applied,
    Queued { id: String, tier: String },
}

impl From<&SubmitOutcome> for EnqueueJson {
    fn from(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Applied => EnqueueJson::Applied,
            SubmitOutcome::Queued(enqueued) => EnqueueJson::Queued {
                id: enqueued.id.clone(),
                tier: enqueued.tier.to_string(),
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    operation_type: OperationType,
    payload: String,
    priority: Option<u8>,
    max_retries: Option<u32>,
    apply: bool,
    owner: OwnerArgs,
    output: OutputFormat,
) -> Result<()> {
    let ctx = Context::load()?;
    let owner = ctx.owner(owner)?;
    let provenance = current_provenance(&ctx.work_dir, &new_session_id())?;
    let op = build_operation(
        &ctx.config.sync,
        &owner,
        operation_type,
        &payload,
        priority,
        max_retries,
        provenance,
        Utc::now(),
    )?;

    let outcome = if apply && ctx.config.remote.is_some() {
        runtime()?.block_on(submit(&ctx, op))?
    } else {
        if apply {
            debug!("no remote configured, queueing");
        }
        SubmitOutcome::Queued(ctx.open_queue()?.enqueue(op)?)
    };

    match output {
        OutputFormat::Text => println!("{}", describe(&outcome)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&EnqueueJson::from(&outcome))?)
        }
    }
    Ok(())
}

/// Applies directly when the store of record answers, else queues.
async fn submit(ctx: &Context, op: NewOperation) -> Result<SubmitOutcome> {
    let (slot, monitor) = ctx.connect_once().await?;
    let controller = ctx.controller(slot.clone(), monitor)?;
    let outcome = controller.submit(op).await;
    disconnect(&slot).await;
    outcome
}

/// Parses the payload and applies config defaults.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_operation(
    sync: &SyncConfig,
    owner: &str,
    operation_type: OperationType,
    payload: &str,
    priority: Option<u8>,
    max_retries: Option<u32>,
    provenance: Provenance,
    now: DateTime<Utc>,
) -> Result<NewOperation> {
    let payload: Value = serde_json::from_str(payload)?;
    let priority = match priority {
        Some(p) => Priority::new(p)?,
        None => sync.priority()?,
    };

    let op = NewOperation::new(owner, operation_type, payload, provenance, now)
        .with_priority(priority)
        .with_max_retries(max_retries.unwrap_or(sync.max_retries));
    op.validate()?;
    Ok(op)
}

pub(crate) fn describe(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Applied => "Applied to store of record".to_string(),
        SubmitOutcome::Queued(enqueued) => {
            format!("Queued {} ({})", enqueued.id, enqueued.tier)
        }
    }
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
