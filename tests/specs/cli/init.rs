// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Init command specs.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::common::*;

#[test]
fn creates_possync_directory() {
    let temp = TempDir::new().unwrap();

    possync()
        .args(["init", "--owner", "store-9"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized possync queue"))
        .stdout(predicate::str::contains("Owner: store-9"));

    let dir = temp.path().join(".possync");
    assert!(dir.join("config.toml").exists());
    assert!(dir.join("queue.db").exists());
    assert!(dir.join("device_id").exists());

    let config = std::fs::read_to_string(dir.join("config.toml")).unwrap();
    assert!(config.contains("owner = \"store-9\""));
}

#[test]
fn fails_if_already_initialized() {
    let temp = init_temp();

    possync()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn path_option_initializes_elsewhere() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("till");
    std::fs::create_dir_all(&target).unwrap();

    possync()
        .args(["init", "--path"])
        .arg(&target)
        .current_dir(temp.path())
        .assert()
        .success();

    assert!(target.join(".possync/config.toml").exists());
    assert!(!temp.path().join(".possync").exists());
}

#[test]
fn rejects_non_websocket_remote() {
    let temp = TempDir::new().unwrap();

    possync()
        .args(["init", "--remote", "http://hq"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ws://"));
}

#[test]
fn commands_outside_a_project_fail() {
    let temp = TempDir::new().unwrap();

    possync()
        .args(["list", "--owner", "x"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("possync init"));
}

#[test]
fn dash_c_runs_in_other_directory() {
    let temp = init_temp();
    let elsewhere = TempDir::new().unwrap();

    possync()
        .arg("-C")
        .arg(temp.path())
        .arg("stats")
        .current_dir(elsewhere.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pending:"));
}
