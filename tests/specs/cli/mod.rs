// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box specs for the possync CLI.
//!
//! Run with: cargo test -p possync --test specs

mod common;
mod init;
mod queue;
mod sync;
