// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ps-remote: WebSocket store of record for possync clients.
//!
//! The server keeps one document per `(collection, key)` and applies client
//! upserts by merging top-level fields, so replayed writes converge.

pub mod server;
pub mod state;

pub use server::{run, serve};
pub use state::ServerState;
