// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use ps_core::{OperationType, SyncStatus};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn operation_type(s: &str) -> Result<OperationType, String> {
    s.parse().map_err(|e: ps_core::Error| e.to_string())
}

fn sync_status(s: &str) -> Result<SyncStatus, String> {
    s.parse().map_err(|e: ps_core::Error| e.to_string())
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Owner selection shared by every queue command.
#[derive(Args, Clone, Debug, Default)]
pub struct OwnerArgs {
    /// Owner (tenant) to act for; defaults to `owner` in config
    #[arg(long, value_parser = non_empty_string)]
    pub owner: Option<String>,
}

#[derive(Parser)]
#[command(name = "possync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline operation queue for point-of-sale terminals")]
#[command(
    long_about = "Offline operation queue for point-of-sale terminals.\n\n\
    Captures sales, customer, inventory and staff changes locally and replays \
    them against the store of record when connectivity returns."
)]
pub struct Cli {
    /// Run as if possync was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<PathBuf>,

    /// Log more (repeat for trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize an offline queue in the current directory (or specified path)
    #[command(after_help = "\
Examples:
  possync init --owner store-12                         Local-only queue
  possync init --owner store-12 --remote ws://hq:7890   Queue with a store of record")]
    Init {
        /// Default owner for queue commands
        #[arg(long, value_parser = non_empty_string)]
        owner: Option<String>,

        /// Store of record URL (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,

        /// Path to initialize (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Capture an operation for later sync
    #[command(after_help = "\
Examples:
  possync enqueue transaction '{\"id\":\"txn-1\",\"total\":1250}' -p 1
  possync enqueue staffAction '{\"actionType\":\"clockIn\",\"staffId\":\"s-1\",\"shiftId\":\"sh-9\"}'
  possync enqueue customerUpdate '{\"id\":\"c-4\",\"points\":20}' --apply")]
    Enqueue {
        /// transaction, customerUpdate, inventoryUpdate or staffAction
        #[arg(value_parser = operation_type)]
        operation_type: OperationType,

        /// JSON object payload
        payload: String,

        /// Priority from 1 (highest) to 5 (lowest); defaults to config
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,

        /// Attempts before the operation is abandoned; defaults to config
        #[arg(long)]
        max_retries: Option<u32>,

        /// Try to apply directly to the store of record before queueing
        #[arg(long)]
        apply: bool,

        #[command(flatten)]
        owner: OwnerArgs,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List queued operations in drain order
    List {
        /// Only show operations in this status
        #[arg(long, short, value_parser = sync_status)]
        status: Option<SyncStatus>,

        #[command(flatten)]
        owner: OwnerArgs,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Run one sync cycle against the store of record
    Sync {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Delete synced operations past retention
    Cleanup {
        /// Delete synced operations older than this many days; defaults to config
        #[arg(long)]
        days: Option<u32>,

        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Show queue health
    Stats {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Stay running: reconnect to the store of record and sync on every
    /// reconnect and interval until interrupted
    Run {
        #[command(flatten)]
        owner: OwnerArgs,
    },
}

impl Command {
    /// Commands that stay up and log at `info` by default.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Command::Run { .. })
    }
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
