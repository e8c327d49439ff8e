// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity state and edge events.
//!
//! A platform adapter reports reachability with
//! [`ConnectivityMonitor::set_online`]; subscribers see only transitions.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

/// Shared online/offline flag.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        ConnectivityMonitor { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records the current reachability. Returns true if this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
        changed
    }

    /// Subscribes to transitions after this point.
    pub fn subscribe(&self) -> ConnectivityEvents {
        let rx = self.tx.subscribe();
        let last = *rx.borrow();
        ConnectivityEvents { rx, last }
    }
}

/// Stream of connectivity transitions for one subscriber.
pub struct ConnectivityEvents {
    rx: watch::Receiver<bool>,
    last: bool,
}

impl ConnectivityEvents {
    /// Waits for the next transition. Returns `None` once the monitor is gone.
    ///
    /// A flap that returns to the last reported state before this
    /// subscriber looks is not reported.
    pub async fn next(&mut self) -> Option<ConnectivityEvent> {
        loop {
            self.rx.changed().await.ok()?;
            let online = *self.rx.borrow_and_update();
            if online != self.last {
                self.last = online;
                return Some(if online {
                    ConnectivityEvent::BecameOnline
                } else {
                    ConnectivityEvent::BecameOffline
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
