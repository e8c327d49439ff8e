// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use possync::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = match (cli.verbose, cli.command.is_long_running()) {
        (0, false) => "warn",
        (0, true) => "info",
        (1, _) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("error: cannot change to {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    if let Err(e) = possync::run(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
