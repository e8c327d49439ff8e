// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use ps_core::identity::load_or_create_device_id;
use ps_core::Database;

use crate::config::{init_work_dir, queue_db_path, Config, RemoteConfig};
use crate::error::Result;

pub fn run(owner: Option<String>, remote: Option<String>, path: Option<PathBuf>) -> Result<()> {
    let target_path = match path {
        Some(p) => p,
        None => std::env::current_dir()?,
    };

    let config = Config {
        owner,
        remote: remote.map(RemoteConfig::new),
        ..Config::default()
    };
    let (work_dir, device_id) = init_at(&target_path, &config)?;

    println!("Initialized possync queue at {}", work_dir.display());
    println!("Device: {}", device_id);
    if let Some(owner) = &config.owner {
        println!("Owner: {}", owner);
    }
    match &config.remote {
        Some(remote) => println!("Remote: {}", remote.url),
        None => println!("Remote: none (local-only until [remote] is configured)"),
    }
    Ok(())
}

/// Creates `.possync/`, the queue database and the device id.
pub(crate) fn init_at(target_path: &Path, config: &Config) -> Result<(PathBuf, String)> {
    let work_dir = init_work_dir(target_path, config)?;
    Database::open(&queue_db_path(&work_dir))?;
    let device_id = load_or_create_device_id(&work_dir)?;
    Ok((work_dir, device_id))
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
