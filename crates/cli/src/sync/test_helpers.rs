// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ps_core::{NewOperation, OperationType, Priority, Provenance};
use ps_remote::ServerState;

use super::remote::{RemoteError, RemoteFuture, RemoteStore};

/// Fixed instant used as "now" by most tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

pub fn provenance() -> Provenance {
    Provenance::new("dev-test", "sess-test")
}

/// A transaction operation for `owner` keyed by `id`.
pub fn transaction(owner: &str, id: &str, priority: u8, created_at: DateTime<Utc>) -> NewOperation {
    NewOperation::new(
        owner,
        OperationType::Transaction,
        json!({ "id": id, "total": 1250 }),
        provenance(),
        created_at,
    )
    .with_priority(Priority::new(priority).unwrap())
}

/// An operation of any type with the given payload.
pub fn operation(owner: &str, operation_type: OperationType, payload: Value) -> NewOperation {
    NewOperation::new(owner, operation_type, payload, provenance(), t0())
}

#[derive(Default)]
struct MemoryInner {
    docs: Mutex<HashMap<(String, String), Value>>,
    applied: Mutex<Vec<String>>,
    fail_keys: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

/// In-memory store of record with merge-on-upsert semantics.
///
/// Clones share state, so a test can keep one handle while the executor
/// owns another.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<MemoryInner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, collection: &str, key: &str) -> Option<Value> {
        self.inner
            .docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Keys of successful upserts, in the order they landed.
    pub fn applied(&self) -> Vec<String> {
        self.inner.applied.lock().unwrap().clone()
    }

    /// Number of upsert calls, successful or not.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn fail_key(&self, key: &str) {
        self.inner.fail_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.fail_keys.lock().unwrap().clear();
        self.inner.fail_all.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.inner.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }
}

impl RemoteStore for MemoryRemote {
    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        document: Value,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.inner.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.inner.fail_all.load(Ordering::SeqCst) {
                return Err(RemoteError::ConnectionClosed);
            }
            if self.inner.fail_keys.lock().unwrap().contains(key) {
                return Err(RemoteError::Rejected(format!("write to {key} refused")));
            }

            let mut docs = self.inner.docs.lock().unwrap();
            let entry = docs
                .entry((collection.to_string(), key.to_string()))
                .or_insert_with(|| json!({}));
            if let (Value::Object(stored), Value::Object(incoming)) = (entry, document) {
                for (field, value) in incoming {
                    stored.insert(field, value);
                }
            }
            self.inner.applied.lock().unwrap().push(key.to_string());
            Ok(())
        })
    }
}

/// An in-process ps-remote server on a random local port.
pub struct TestRemoteServer {
    pub url: String,
    pub state: ServerState,
    task: JoinHandle<()>,
}

impl TestRemoteServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve_on(listener).await
    }

    pub async fn serve_on(listener: TcpListener) -> Self {
        let addr = listener.local_addr().unwrap();
        let state = ServerState::in_memory().unwrap();
        let serve_state = state.clone();
        let task = tokio::spawn(async move {
            let _ = ps_remote::serve(listener, serve_state).await;
        });
        TestRemoteServer {
            url: format!("ws://{addr}"),
            state,
            task,
        }
    }
}

impl Drop for TestRemoteServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A local URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

/// Polls `cond` every few milliseconds for up to two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
