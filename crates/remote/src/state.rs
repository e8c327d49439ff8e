// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the document store for shared access across connections.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use ps_core::{ClockSource, DocumentStore, Error, Result, SystemClock};

/// File name of the document database inside the data directory.
pub const DOCUMENTS_DB_FILE: &str = "documents.db";

/// Shared server state containing the document store.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    store: Mutex<DocumentStore>,
    /// Rejects every upsert while set.
    read_only: AtomicBool,
    /// Upserts that changed a document.
    writes: AtomicU64,
}

impl ServerState {
    /// Opens the document store in the given directory.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let store = DocumentStore::open(&data_dir.join(DOCUMENTS_DB_FILE))?;
        Ok(Self::with_store(store))
    }

    /// State backed by an in-memory store.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_store(DocumentStore::open_in_memory()?))
    }

    fn with_store(store: DocumentStore) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner {
                store: Mutex::new(store),
                read_only: AtomicBool::new(false),
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Toggles read-only mode.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.load(Ordering::SeqCst)
    }

    /// Merges `document` into `(collection, key)`.
    ///
    /// Returns Ok(true) if the stored document changed, Ok(false) for a replay.
    pub async fn upsert(&self, collection: &str, key: &str, document: Value) -> Result<bool> {
        if self.is_read_only() {
            return Err(Error::InvalidInput("store is read-only".to_string()));
        }

        let changed = {
            let mut store = self.inner.store.lock().await;
            store.upsert(collection, key, document, SystemClock.now())?
        };
        if changed {
            self.inner.writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(changed)
    }

    pub async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let store = self.inner.store.lock().await;
        store.get(collection, key)
    }

    pub async fn count(&self, collection: &str) -> Result<usize> {
        let store = self.inner.store.lock().await;
        store.count(collection)
    }

    /// Number of upserts that changed a document since startup.
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::Relaxed)
    }
}
