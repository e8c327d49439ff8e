// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Provenance identity for queued operations.
//!
//! Every operation records the device it was captured on and the process
//! session that captured it. The device id is generated once and persisted
//! in the data directory; the session id is fresh for every process.

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::id::short_hash;
use crate::operation::Provenance;

/// File name of the persisted device id inside the data directory.
pub const DEVICE_ID_FILE: &str = "device_id";

/// Returns the persisted device id, creating it on first use.
///
/// Resolution order:
/// 1. Existing `device_id` file in `data_dir` (trimmed, must be non-empty)
/// 2. A freshly generated `dev-{hash}` written to that file
pub fn load_or_create_device_id(data_dir: &Path) -> Result<String> {
    let path = data_dir.join(DEVICE_ID_FILE);

    match fs::read_to_string(&path) {
        Ok(content) => {
            let id = content.trim();
            if id.is_empty() {
                return Err(Error::CorruptedData(format!(
                    "empty device id in {}",
                    path.display()
                )));
            }
            return Ok(id.to_string());
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }

    let id = format!("dev-{}", short_hash(&host_seed(), &Utc::now(), 8));
    fs::write(&path, format!("{id}\n"))?;
    Ok(id)
}

/// Generates a session id for this process.
pub fn new_session_id() -> String {
    format!("sess-{}", short_hash(&host_seed(), &Utc::now(), 8))
}

/// Builds the provenance tag for operations captured by this process.
pub fn current_provenance(data_dir: &Path, session_id: &str) -> Result<Provenance> {
    let device_id = load_or_create_device_id(data_dir)?;
    Ok(Provenance::new(device_id, session_id))
}

fn host_seed() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "possync".to_string())
}
