// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ps-remote: WebSocket store of record for possync clients.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ps_remote::ServerState;

/// ps-remote: store of record for offline point-of-sale queues
#[derive(Parser, Debug)]
#[command(name = "ps-remote")]
#[command(about = "WebSocket store of record for possync clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the document database
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Reject all writes (reads and pings still work)
    #[arg(long)]
    read_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting ps-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = ServerState::new(&args.data)?;
    if args.read_only {
        info!("  Read-only: writes will be rejected");
        state.set_read_only(true);
    }

    ps_remote::run(args.bind, state).await
}
