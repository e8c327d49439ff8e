// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Keeps a connection to the store of record and reports reachability.
//!
//! The supervisor connects with exponential backoff, publishes the live
//! connection through a [`RemoteSlot`], and pings it on an interval. Every
//! connect and every lost connection is reported to the
//! [`ConnectivityMonitor`], which is what wakes the sync controller.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connectivity::ConnectivityMonitor;
use super::remote::{RemoteSlot, WebSocketRemote};

pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_CONNECTED: u8 = 2;

/// Link state readable without locks.
#[derive(Debug, Default)]
pub struct LinkState {
    state: AtomicU8,
    attempt: AtomicU32,
}

impl LinkState {
    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn set(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }

    /// Connection attempts since the last successful connect.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == STATE_CONNECTED
    }

    pub fn status_string(&self) -> String {
        match self.get() {
            STATE_DISCONNECTED => "disconnected".to_string(),
            STATE_CONNECTING => match self.attempt() {
                0 => "connecting".to_string(),
                n => format!("connecting (attempt {n})"),
            },
            STATE_CONNECTED => "connected".to_string(),
            _ => "unknown".to_string(),
        }
    }
}

/// Link tuning.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub url: String,
    pub request_timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl LinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        LinkConfig {
            url: url.into(),
            request_timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

/// Background task owning the remote connection.
pub struct LinkSupervisor {
    token: CancellationToken,
    task: JoinHandle<()>,
    state: Arc<LinkState>,
}

impl LinkSupervisor {
    /// Starts connecting in the background.
    pub fn spawn(config: LinkConfig, slot: RemoteSlot, monitor: ConnectivityMonitor) -> Self {
        let token = CancellationToken::new();
        let state = Arc::new(LinkState::default());
        let task = tokio::spawn(supervise(
            config,
            slot,
            monitor,
            Arc::clone(&state),
            token.clone(),
        ));
        LinkSupervisor { token, task, state }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Drops the connection and stops reconnecting.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

async fn supervise(
    config: LinkConfig,
    slot: RemoteSlot,
    monitor: ConnectivityMonitor,
    state: Arc<LinkState>,
    token: CancellationToken,
) {
    loop {
        let Some(remote) = connect_with_retry(&config, &state, &token).await else {
            break;
        };
        let remote = Arc::new(remote);
        slot.set(Arc::clone(&remote)).await;
        monitor.set_online(true);
        info!(url = %config.url, "remote link up");

        let cancelled = watch_link(&config, &remote, &token).await;

        slot.clear().await;
        monitor.set_online(false);
        state.set(STATE_DISCONNECTED);
        remote.close().await;
        if cancelled {
            break;
        }
        warn!(url = %config.url, "remote link lost, reconnecting");
    }

    slot.clear().await;
    monitor.set_online(false);
    state.set(STATE_DISCONNECTED);
    debug!("link supervisor stopped");
}

/// Pings until the link fails. Returns true if stopped by cancellation.
async fn watch_link(
    config: &LinkConfig,
    remote: &WebSocketRemote,
    token: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            _ = token.cancelled() => return true,
            _ = tokio::time::sleep(config.heartbeat_interval) => {}
        }
        if !remote.is_connected() {
            return false;
        }
        if let Err(e) = remote.ping().await {
            debug!(error = %e, "heartbeat failed");
            return false;
        }
    }
}

/// Connects with exponential backoff until connected or cancelled.
async fn connect_with_retry(
    config: &LinkConfig,
    state: &LinkState,
    token: &CancellationToken,
) -> Option<WebSocketRemote> {
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        if token.is_cancelled() {
            return None;
        }

        attempt = attempt.saturating_add(1);
        state.set(STATE_CONNECTING);
        state.set_attempt(attempt);

        let result = tokio::select! {
            _ = token.cancelled() => return None,
            result = WebSocketRemote::connect(&config.url, config.request_timeout) => result,
        };

        match result {
            Ok(remote) => {
                state.set(STATE_CONNECTED);
                state.set_attempt(0);
                return Some(remote);
            }
            Err(e) => {
                debug!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "connect failed");
                tokio::select! {
                    _ = token.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = std::cmp::min(delay.saturating_mul(2), config.max_delay);
            }
        }
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
