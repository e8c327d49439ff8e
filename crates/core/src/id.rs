// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier generation.
//!
//! Ids are the first bytes of a SHA-256 digest over a seed, a timestamp and a
//! process-wide counter, rendered as lowercase hex.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of ids assigned by the local-only fallback tier.
pub const LOCAL_ID_PREFIX: &str = "local-";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hash `seed`, `at` and a fresh counter value into `bytes` bytes of hex.
pub fn short_hash(seed: &str, at: &DateTime<Utc>, bytes: usize) -> String {
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let input = format!(
        "{}{}{}{}",
        seed,
        at.to_rfc3339(),
        count,
        std::process::id()
    );
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..bytes.min(hash.len())])
}

/// Generate an id for a record held by the fallback tier.
/// Format: `local-{hash}` with 12 hex chars.
pub fn generate_local_id(owner_id: &str, at: &DateTime<Utc>) -> String {
    format!("{}{}", LOCAL_ID_PREFIX, short_hash(owner_id, at, 6))
}

/// Returns true if the id was assigned by the fallback tier.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
