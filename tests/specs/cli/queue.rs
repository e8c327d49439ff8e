// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Enqueue, list, stats and cleanup specs.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::common::*;

#[test]
fn enqueue_assigns_sequential_ids() {
    let temp = init_temp();

    let first = enqueue(temp.path(), &["transaction", r#"{"id":"txn-1"}"#]);
    let second = enqueue(temp.path(), &["transaction", r#"{"id":"txn-2"}"#]);

    assert_eq!(first, "op-1");
    assert_eq!(second, "op-2");
}

#[test]
fn enqueue_text_output() {
    let temp = init_temp();

    possync()
        .args(["enqueue", "customerUpdate", r#"{"id":"c-1","points":3}"#])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued op-1 (primary)"));
}

#[test]
fn enqueue_rejects_bad_payload() {
    let temp = init_temp();

    possync()
        .args(["enqueue", "transaction", "[1]"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid payload"));

    possync()
        .args(["enqueue", "transaction", "{oops"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn list_is_in_drain_order() {
    let temp = init_temp();
    enqueue(temp.path(), &["transaction", r#"{"id":"a"}"#, "-p", "3"]);
    enqueue(temp.path(), &["transaction", r#"{"id":"b"}"#, "-p", "1"]);
    enqueue(temp.path(), &["transaction", r#"{"id":"c"}"#, "-p", "5"]);
    enqueue(temp.path(), &["transaction", r#"{"id":"d"}"#, "-p", "1"]);

    let ops = list_json(temp.path(), &[]);
    let keys: Vec<&str> = ops
        .iter()
        .map(|op| op["payload"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["b", "d", "a", "c"]);
}

#[test]
fn list_is_scoped_by_owner() {
    let temp = init_temp();
    enqueue(temp.path(), &["transaction", r#"{"id":"mine"}"#]);
    enqueue(
        temp.path(),
        &["transaction", r#"{"id":"theirs"}"#, "--owner", "store-2"],
    );

    let mine = list_json(temp.path(), &[]);
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["payload"]["id"], "mine");

    let theirs = list_json(temp.path(), &["--owner", "store-2"]);
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0]["owner_id"], "store-2");
}

#[test]
fn list_filters_by_status() {
    let temp = init_temp();
    enqueue(temp.path(), &["transaction", r#"{"id":"a"}"#]);

    assert_eq!(list_json(temp.path(), &["-s", "pending"]).len(), 1);
    assert!(list_json(temp.path(), &["-s", "failed"]).is_empty());
}

#[test]
fn list_text_when_empty() {
    let temp = init_temp();

    possync()
        .arg("list")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No operations"));
}

#[test]
fn missing_owner_is_an_error() {
    let temp = TempDir::new().unwrap();
    possync().arg("init").current_dir(temp.path()).assert().success();

    possync()
        .arg("list")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--owner"));
}

#[test]
fn stats_json_counts_pending() {
    let temp = init_temp();
    enqueue(temp.path(), &["inventoryUpdate", r#"{"id":"sku-1","stock":4}"#]);
    enqueue(temp.path(), &["inventoryUpdate", r#"{"id":"sku-2","stock":0}"#]);

    let output = possync()
        .args(["stats", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(stats["pending"], 2);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["health_score"], 1.0);
    assert_eq!(stats["fallback_pending"], 0);
}

#[test]
fn cleanup_keeps_unsynced_operations() {
    let temp = init_temp();
    enqueue(temp.path(), &["transaction", r#"{"id":"a"}"#]);

    possync()
        .args(["cleanup", "--days", "0"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0"));

    assert_eq!(list_json(temp.path(), &[]).len(), 1);
}
