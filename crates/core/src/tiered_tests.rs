// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::Database;
use crate::fallback::FallbackQueue;
use crate::id::is_local_id;
use crate::operation::{OperationType, Priority, Provenance};
use crate::reopen::ReopeningStore;
use chrono::TimeZone;
use serde_json::json;
use tempfile::TempDir;

type BoxedTiered = TieredQueue<Box<dyn QueueStore>, FallbackQueue>;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn new_op(owner: &str, created: i64) -> NewOperation {
    NewOperation::new(
        owner,
        OperationType::CustomerUpdate,
        json!({"id": format!("cust-{created}"), "name": "Ada"}),
        Provenance::new("dev-1", "sess-1"),
        at(created),
    )
}

fn unavailable(temp: &TempDir) -> BoxedTiered {
    let fallback = FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap();
    TieredQueue::new(Box::new(UnavailableStore::new("disk full")), fallback)
}

#[test]
fn healthy_primary_takes_the_write() {
    let temp = TempDir::new().unwrap();
    let fallback = FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap();
    let mut queue = TieredQueue::new(Database::open_in_memory().unwrap(), fallback);

    let enqueued = queue.enqueue(new_op("shop-1", 0)).unwrap();
    assert_eq!(enqueued.tier, Tier::Primary);
    assert_eq!(enqueued.id, "op-1");
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 0);
}

#[test]
fn unavailable_primary_routes_to_fallback() {
    let temp = TempDir::new().unwrap();
    let mut queue = unavailable(&temp);

    let enqueued = queue.enqueue(new_op("shop-1", 0)).unwrap();
    assert_eq!(enqueued.tier, Tier::Fallback);
    assert!(is_local_id(&enqueued.id));
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 1);
    assert!(queue.fallback().get(&enqueued.id).is_ok());
}

#[test]
fn get_finds_fallback_records_by_local_id() {
    let temp = TempDir::new().unwrap();
    let mut queue = unavailable(&temp);

    let enqueued = queue.enqueue(new_op("shop-1", 0)).unwrap();
    let found = QueueStore::get(&queue, &enqueued.id).unwrap();

    assert_eq!(found.id, enqueued.id);
    assert_eq!(found.sync_status, SyncStatus::Pending);
}

#[test]
fn invalid_input_never_reaches_fallback() {
    let temp = TempDir::new().unwrap();
    let mut queue = unavailable(&temp);
    let mut op = new_op("shop-1", 0);
    op.payload = json!("not an object");

    assert!(matches!(
        queue.enqueue(op).unwrap_err(),
        Error::InvalidPayload(_)
    ));
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 0);
}

#[test]
fn both_tiers_failing_is_an_error() {
    let mut queue = TieredQueue::new(
        UnavailableStore::new("primary gone"),
        UnavailableStore::new("fallback gone"),
    );
    let err = queue.enqueue(new_op("shop-1", 0)).unwrap_err();
    match err {
        Error::QueueUnavailable { primary, fallback } => {
            assert!(primary.contains("primary gone"));
            assert!(fallback.contains("fallback gone"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_moves_records_into_recovered_primary() {
    let temp = TempDir::new().unwrap();
    let mut queue = unavailable(&temp);
    let op = new_op("shop-1", 0).with_priority(Priority::HIGHEST);
    queue.enqueue(op).unwrap();
    queue.enqueue(new_op("shop-2", 1)).unwrap();

    *queue.primary_mut() = Box::new(Database::open_in_memory().unwrap());

    assert_eq!(queue.merge_fallback("shop-1").unwrap(), 1);
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 0);
    assert_eq!(queue.fallback_len("shop-2").unwrap(), 1);

    let merged = queue.list_drainable("shop-1").unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, "op-1");
    assert_eq!(merged[0].priority, Priority::HIGHEST);
    assert_eq!(merged[0].created_at, at(0));
    assert_eq!(merged[0].sync_status, SyncStatus::Pending);
    assert_eq!(merged[0].device_id, "dev-1");
}

#[test]
fn merge_with_empty_fallback_is_noop() {
    let temp = TempDir::new().unwrap();
    let fallback = FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap();
    let mut queue = TieredQueue::new(Database::open_in_memory().unwrap(), fallback);
    assert_eq!(queue.merge_fallback("shop-1").unwrap(), 0);
}

#[test]
fn failed_merge_keeps_records_in_fallback() {
    let temp = TempDir::new().unwrap();
    let mut queue = unavailable(&temp);
    queue.enqueue(new_op("shop-1", 0)).unwrap();
    queue.enqueue(new_op("shop-1", 1)).unwrap();

    assert!(queue.merge_fallback("shop-1").is_err());
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 2);
}

#[test]
fn reads_and_marks_go_to_primary() {
    let temp = TempDir::new().unwrap();
    let fallback = FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap();
    let mut queue = TieredQueue::new(Database::open_in_memory().unwrap(), fallback);
    let id = QueueStore::enqueue(&mut queue, new_op("shop-1", 0)).unwrap();

    queue.mark_syncing(&id, at(1)).unwrap();
    queue.mark_synced(&id, at(2)).unwrap();
    assert_eq!(
        queue.primary().get(&id).unwrap().sync_status,
        SyncStatus::Synced
    );
    assert_eq!(queue.counts("shop-1", at(0)).unwrap().synced_since, 1);
}

/// Store wrapper that rejects chosen writes.
struct Flaky<S> {
    inner: S,
    /// Payload ids whose enqueue fails.
    reject: Vec<&'static str>,
    fail_remove: bool,
}

impl<S> Flaky<S> {
    fn new(inner: S) -> Self {
        Flaky {
            inner,
            reject: Vec::new(),
            fail_remove: false,
        }
    }
}

impl<S: QueueStore> QueueStore for Flaky<S> {
    fn enqueue(&mut self, op: NewOperation) -> Result<String> {
        let key = op.payload["id"].as_str().unwrap_or_default();
        if self.reject.iter().any(|r| *r == key) {
            return Err(Error::InvalidInput(format!("rejected {key}")));
        }
        self.inner.enqueue(op)
    }

    fn get(&self, id: &str) -> Result<OfflineOperation> {
        self.inner.get(id)
    }

    fn list(&self, owner_id: &str, status: Option<SyncStatus>) -> Result<Vec<OfflineOperation>> {
        self.inner.list(owner_id, status)
    }

    fn list_drainable(&self, owner_id: &str) -> Result<Vec<OfflineOperation>> {
        self.inner.list_drainable(owner_id)
    }

    fn mark_syncing(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_syncing(id, at)
    }

    fn mark_synced(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_synced(id, at)
    }

    fn mark_failed(&mut self, id: &str, error: &str, at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_failed(id, error, at)
    }

    fn mark_abandoned(&mut self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_abandoned(id, reason, at)
    }

    fn purge(&mut self, owner_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        self.inner.purge(owner_id, older_than)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        if self.fail_remove {
            return Err(Error::Io(std::io::Error::other("fallback disk full")));
        }
        self.inner.remove(id)
    }

    fn counts(&self, owner_id: &str, synced_since: DateTime<Utc>) -> Result<StatusCounts> {
        self.inner.counts(owner_id, synced_since)
    }
}

/// Fallback holding `cust-0` and `cust-1` for shop-1.
fn seeded_fallback(temp: &TempDir) -> Flaky<FallbackQueue> {
    let mut fallback = Flaky::new(FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap());
    fallback.enqueue(new_op("shop-1", 0)).unwrap();
    fallback.enqueue(new_op("shop-1", 1)).unwrap();
    fallback
}

fn payload_ids<S: QueueStore>(store: &S) -> Vec<String> {
    store
        .list("shop-1", None)
        .unwrap()
        .iter()
        .map(|op| op.payload["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn merge_never_drops_records_when_both_tiers_fail() {
    let temp = TempDir::new().unwrap();
    let mut fallback = seeded_fallback(&temp);
    fallback.fail_remove = true;
    let mut queue = TieredQueue::new(UnavailableStore::new("disk full"), fallback);

    assert!(matches!(
        queue.merge_fallback("shop-1"),
        Err(Error::PrimaryUnavailable(_))
    ));
    assert_eq!(payload_ids(queue.fallback()), ["cust-0", "cust-1"]);
}

#[test]
fn rejected_record_does_not_stop_the_rest() {
    let temp = TempDir::new().unwrap();
    let mut primary = Flaky::new(Database::open_in_memory().unwrap());
    primary.reject.push("cust-0");
    let mut queue = TieredQueue::new(primary, seeded_fallback(&temp));

    assert_eq!(queue.merge_fallback("shop-1").unwrap(), 1);
    assert_eq!(payload_ids(queue.primary()), ["cust-1"]);
    assert_eq!(payload_ids(queue.fallback()), ["cust-0"]);
}

#[test]
fn failed_fallback_cleanup_keeps_merged_copy() {
    let temp = TempDir::new().unwrap();
    let mut primary = Flaky::new(Database::open_in_memory().unwrap());
    primary.reject.push("cust-0");
    let mut fallback = seeded_fallback(&temp);
    fallback.fail_remove = true;
    let mut queue = TieredQueue::new(primary, fallback);

    assert_eq!(queue.merge_fallback("shop-1").unwrap(), 1);
    assert_eq!(payload_ids(queue.primary()), ["cust-1"]);
    assert_eq!(payload_ids(queue.fallback()), ["cust-0", "cust-1"]);
}

#[test]
fn reopened_primary_takes_merge_and_new_writes() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("queue.db");
    std::fs::create_dir_all(&db_path).unwrap();
    let fallback = FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap();
    let mut queue = TieredQueue::new(ReopeningStore::open(&db_path), fallback);

    let first = queue.enqueue(new_op("shop-1", 0)).unwrap();
    assert_eq!(first.tier, Tier::Fallback);

    std::fs::remove_dir(&db_path).unwrap();
    queue.ensure_primary().unwrap();

    assert_eq!(queue.merge_fallback("shop-1").unwrap(), 1);
    assert_eq!(queue.fallback_len("shop-1").unwrap(), 0);
    let second = queue.enqueue(new_op("shop-1", 1)).unwrap();
    assert_eq!(second.tier, Tier::Primary);
    assert_eq!(queue.list_drainable("shop-1").unwrap().len(), 2);
}
