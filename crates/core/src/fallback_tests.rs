// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::id::is_local_id;
use crate::operation::{OperationType, Priority, Provenance};
use chrono::{Duration, TimeZone};
use serde_json::json;
use tempfile::TempDir;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn new_op(owner: &str, priority: u8, created: i64) -> NewOperation {
    NewOperation::new(
        owner,
        OperationType::InventoryUpdate,
        json!({"id": format!("sku-{created}"), "quantity": 4}),
        Provenance::new("dev-1", "sess-1"),
        at(created),
    )
    .with_priority(Priority::new(priority).unwrap())
}

fn open(temp: &TempDir) -> FallbackQueue {
    FallbackQueue::open(&temp.path().join("fallback.jsonl")).unwrap()
}

#[test]
fn open_creates_empty_file() {
    let temp = TempDir::new().unwrap();
    let queue = open(&temp);
    assert!(queue.path().exists());
    assert!(queue.list("shop-1", None).unwrap().is_empty());
    assert_eq!(queue.len_for("shop-1").unwrap(), 0);
}

#[test]
fn enqueue_assigns_local_ids_and_persists() {
    let temp = TempDir::new().unwrap();
    let id = {
        let mut queue = open(&temp);
        queue.enqueue(new_op("shop-1", 3, 0)).unwrap()
    };
    assert!(is_local_id(&id));

    let queue = open(&temp);
    let op = queue.get(&id).unwrap();
    assert_eq!(op.sync_status, SyncStatus::Pending);
    assert_eq!(op.payload["id"], "sku-0");
}

#[test]
fn enqueue_validates() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let mut op = new_op("shop-1", 3, 0);
    op.owner_id = "  ".to_string();
    assert!(matches!(
        queue.enqueue(op).unwrap_err(),
        Error::InvalidInput(_)
    ));
}

#[test]
fn drainable_is_sorted_and_owner_scoped() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let a = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();
    let b = queue.enqueue(new_op("shop-1", 1, 1)).unwrap();
    queue.enqueue(new_op("shop-2", 1, 2)).unwrap();
    let c = queue.enqueue(new_op("shop-1", 5, 3)).unwrap();
    let d = queue.enqueue(new_op("shop-1", 1, 4)).unwrap();

    let ids: Vec<_> = queue
        .list_drainable("shop-1")
        .unwrap()
        .into_iter()
        .map(|op| op.id)
        .collect();
    assert_eq!(ids, vec![b, d, a, c]);
}

#[test]
fn marks_are_validated_and_persisted() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let id = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();

    assert!(queue.mark_synced(&id, at(1)).is_err());
    queue.mark_syncing(&id, at(1)).unwrap();
    queue.mark_failed(&id, "offline", at(2)).unwrap();

    let reopened = open(&temp);
    let op = reopened.get(&id).unwrap();
    assert_eq!(op.sync_status, SyncStatus::Failed);
    assert_eq!(op.retry_count, 1);
    assert_eq!(op.error_message.as_deref(), Some("offline"));
}

#[test]
fn remove_deletes_one_record() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let first = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();
    let second = queue.enqueue(new_op("shop-1", 2, 1)).unwrap();
    queue.enqueue(new_op("shop-2", 3, 2)).unwrap();

    queue.remove(&first).unwrap();

    let left = queue.list("shop-1", None).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, second);
    assert_eq!(queue.len_for("shop-2").unwrap(), 1);
    assert!(matches!(
        queue.remove(&first),
        Err(Error::OperationNotFound(_))
    ));
}

#[test]
fn purge_only_removes_old_synced() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let now = at(30 * 86_400);
    let old = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();
    let fresh = queue.enqueue(new_op("shop-1", 3, 1)).unwrap();
    let failed = queue.enqueue(new_op("shop-1", 3, 2)).unwrap();

    queue.mark_syncing(&old, now - Duration::days(8)).unwrap();
    queue.mark_synced(&old, now - Duration::days(8)).unwrap();
    queue.mark_syncing(&fresh, now - Duration::days(6)).unwrap();
    queue.mark_synced(&fresh, now - Duration::days(6)).unwrap();
    queue.mark_syncing(&failed, now - Duration::days(9)).unwrap();
    queue.mark_failed(&failed, "x", now - Duration::days(9)).unwrap();

    assert_eq!(queue.purge("shop-1", now - Duration::days(7)).unwrap(), 1);
    assert!(queue.get(&old).is_err());
    assert!(queue.get(&fresh).is_ok());
    assert!(queue.get(&failed).is_ok());
}

#[test]
fn torn_line_is_skipped() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let id = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();

    let mut file = OpenOptions::new()
        .append(true)
        .open(queue.path())
        .unwrap();
    write!(file, "{{\"id\":\"local-trunc").unwrap();

    let ops = queue.list("shop-1", None).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].id, id);
}

#[test]
fn counts_cover_every_status() {
    let temp = TempDir::new().unwrap();
    let mut queue = open(&temp);
    let a = queue.enqueue(new_op("shop-1", 3, 0)).unwrap();
    let b = queue.enqueue(new_op("shop-1", 3, 1)).unwrap();
    queue.enqueue(new_op("shop-1", 3, 2)).unwrap();
    queue.mark_syncing(&a, at(10)).unwrap();
    queue.mark_synced(&a, at(10)).unwrap();
    queue.mark_abandoned(&b, "stuck", at(10)).unwrap();

    let counts = queue.counts("shop-1", at(5)).unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.abandoned, 1);
    assert_eq!(counts.synced_since, 1);
    assert_eq!(queue.counts("shop-1", at(11)).unwrap().synced_since, 0);
}
