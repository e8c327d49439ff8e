// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test files,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::TcpListener as StdTcpListener;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn possync() -> Command {
    let mut cmd = cargo_bin_cmd!("possync");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper to create an initialized temp directory with a default owner.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    possync()
        .args(["init", "--owner", "store-1"])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to create an initialized temp directory pointing at `url`.
pub fn init_temp_remote(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    possync()
        .args(["init", "--owner", "store-1", "--remote", url])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Enqueue and return the printed id.
pub fn enqueue(dir: &Path, args: &[&str]) -> String {
    let output = possync()
        .arg("enqueue")
        .args(args)
        .args(["-o", "json"])
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "enqueue failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["id"].as_str().unwrap().to_string()
}

/// Run `list -o json` and return the operations array.
pub fn list_json(dir: &Path, extra: &[&str]) -> Vec<serde_json::Value> {
    let output = possync()
        .args(["list", "-o", "json"])
        .args(extra)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["operations"].as_array().unwrap().clone()
}

/// A ws:// URL nothing listens on.
pub fn dead_url() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

/// A ps-remote server running on its own thread for the test's lifetime.
pub struct RemoteServer {
    pub url: String,
    pub state: ps_remote::ServerState,
    runtime: tokio::runtime::Runtime,
}

impl RemoteServer {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let state = ps_remote::ServerState::in_memory().unwrap();
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let serve_state = state.clone();
        runtime.spawn(async move {
            let _ = ps_remote::serve(listener, serve_state).await;
        });
        RemoteServer {
            url: format!("ws://{addr}"),
            state,
            runtime,
        }
    }

    pub fn document(&self, collection: &str, key: &str) -> Option<serde_json::Value> {
        self.runtime
            .block_on(self.state.get(collection, key))
            .unwrap()
    }
}
