// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync specs against a live ps-remote server.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::common::*;

#[test]
fn sync_without_remote_is_an_error() {
    let temp = init_temp();

    possync()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remote configured"));
}

#[test]
fn sync_with_unreachable_remote_reports_offline() {
    let temp = init_temp_remote(&dead_url());
    enqueue(temp.path(), &["transaction", r#"{"id":"txn-1"}"#]);

    possync()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("offline"));

    let ops = list_json(temp.path(), &["-s", "pending"]);
    assert_eq!(ops.len(), 1);
}

#[test]
fn sync_drains_queue_into_store() {
    let server = RemoteServer::start();
    let temp = init_temp_remote(&server.url);
    enqueue(temp.path(), &["transaction", r#"{"id":"txn-1","total":1250}"#]);
    enqueue(
        temp.path(),
        &[
            "staffAction",
            r#"{"actionType":"clockIn","staffId":"s-1","shiftId":"sh-1"}"#,
        ],
    );

    possync()
        .args(["sync", "-o", "json"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""synced":2"#));

    let txn = server.document("transactions", "txn-1").unwrap();
    assert_eq!(txn["total"], 1250);
    assert_eq!(txn["ownerId"], "store-1");
    assert!(server.document("staff_shifts", "sh-1").is_some());
    assert_eq!(list_json(temp.path(), &["-s", "synced"]).len(), 2);
}

#[test]
fn failed_write_is_recorded_and_retried() {
    let server = RemoteServer::start();
    server.state.set_read_only(true);
    let temp = init_temp_remote(&server.url);
    enqueue(temp.path(), &["customerUpdate", r#"{"id":"c-1"}"#]);

    possync()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("failed 1"));

    let failed = list_json(temp.path(), &["-s", "failed"]);
    assert_eq!(failed[0]["retry_count"], 1);
    assert!(failed[0]["error_message"]
        .as_str()
        .unwrap()
        .contains("read-only"));

    server.state.set_read_only(false);
    possync()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Synced 1"));
    assert!(server.document("customers", "c-1").is_some());
}

#[test]
fn enqueue_apply_writes_through_when_online() {
    let server = RemoteServer::start();
    let temp = init_temp_remote(&server.url);

    possync()
        .args(["enqueue", "inventoryUpdate", r#"{"id":"sku-7","stock":2}"#, "--apply"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied"));

    assert!(server.document("inventory", "sku-7").is_some());
    assert!(list_json(temp.path(), &[]).is_empty());
}

#[test]
fn enqueue_apply_queues_when_offline() {
    let temp = init_temp_remote(&dead_url());

    possync()
        .args(["enqueue", "inventoryUpdate", r#"{"id":"sku-7"}"#, "--apply"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued op-1"));
}
