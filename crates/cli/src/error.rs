// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::RemoteError;

/// All possible errors that can occur in the possync library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'possync init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no owner given\n  hint: pass --owner or set 'owner' in .possync/config.toml")]
    MissingOwner,

    #[error("no remote configured\n  hint: set [remote] url in .possync/config.toml")]
    NoRemote,

    #[error("offline: cannot sync while the remote store is unreachable")]
    Offline,

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] ps_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for possync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
