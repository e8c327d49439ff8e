// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.possync/config.toml` and includes:
//! - `owner`: Default owner (tenant) for commands that take `--owner`
//! - `[sync]`: Cycle interval, retention and defaults for new operations
//! - `[remote]`: Store of record URL and link tuning (optional; without it
//!   the queue is local-only)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ps_core::Priority;

use crate::error::{Error, Result};
use crate::sync::{LinkConfig, SyncSettings};

const WORK_DIR_NAME: &str = ".possync";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_DB_FILE_NAME: &str = "queue.db";
const FALLBACK_FILE_NAME: &str = "fallback.jsonl";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.possync/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Owner used when `--owner` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Store of record (optional - if absent, runs in local-only mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

/// Sync cycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Time between cycles while online, in milliseconds (default: 30000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Days to keep synced operations (default: 7).
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Priority for new operations, 1 (highest) to 5 (default: 3).
    #[serde(default = "default_priority")]
    pub default_priority: u8,
    /// Attempts before an operation is abandoned (default: 5).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_ms: default_interval_ms(),
            retention_days: default_retention_days(),
            default_priority: default_priority(),
            max_retries: default_max_retries(),
        }
    }
}

/// Store of record connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL (`ws://...` or `wss://...`).
    pub url: String,
    /// Max time to wait for a connect or a reply, in milliseconds (default: 5000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// First reconnect delay in milliseconds (default: 100).
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts in seconds (default: 30).
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// Heartbeat ping interval in milliseconds (default: 10000).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    30_000
}

fn default_retention_days() -> u32 {
    7
}

fn default_priority() -> u8 {
    3
}

fn default_max_retries() -> u32 {
    5
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_reconnect_initial_delay_ms() -> u64 {
    100
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

impl SyncConfig {
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            interval: Duration::from_millis(self.interval_ms),
            retention_days: self.retention_days,
        }
    }

    pub fn priority(&self) -> Result<Priority> {
        Priority::new(self.default_priority)
            .map_err(|e| Error::Config(format!("sync.default_priority: {e}")))
    }
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteConfig {
            url: url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }

    /// Validates that the URL is a WebSocket URL.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            return None;
        }
        Some(format!(
            "invalid remote URL '{}': must be ws:// or wss://",
            self.url
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            url: self.url.clone(),
            request_timeout: self.request_timeout(),
            initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
            max_delay: Duration::from_secs(self.reconnect_max_delay_secs),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        }
    }
}

impl Config {
    /// Loads configuration from the given `.possync/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the given `.possync/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.sync.priority()?;
        if self.sync.interval_ms == 0 {
            return Err(Error::Config("sync.interval_ms must be positive".into()));
        }
        if let Some(msg) = self.remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(msg));
        }
        Ok(())
    }

    /// Returns the explicit owner, or the configured default.
    pub fn resolve_owner(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.owner.clone())
            .map(|owner| owner.trim().to_string())
            .filter(|owner| !owner.is_empty())
            .ok_or(Error::MissingOwner)
    }
}

/// Find the .possync directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn queue_db_path(work_dir: &Path) -> PathBuf {
    work_dir.join(QUEUE_DB_FILE_NAME)
}

pub fn fallback_path(work_dir: &Path) -> PathBuf {
    work_dir.join(FALLBACK_FILE_NAME)
}

/// Initialize a new .possync directory at the given path
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    config.validate()?;
    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;
    write_gitignore(&work_dir)?;

    Ok(work_dir)
}

/// Write a .gitignore file to the work directory.
///
/// Queue state and the device identity never belong in version control.
pub fn write_gitignore(work_dir: &Path) -> Result<()> {
    let content = "# Queue state\nqueue.db\nqueue.db-*\nfallback.jsonl\nfallback.jsonl.tmp\n\n# Per-install identity\ndevice_id\n";
    fs::write(work_dir.join(GITIGNORE_FILE_NAME), content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
