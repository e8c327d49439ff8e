// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol between a sync client and the store of record.
//!
//! Every message is a JSON text frame tagged by `type`. Requests carry a
//! client-chosen `request_id` that the server echoes in its reply, so a
//! client may match responses without relying on frame order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Insert or merge a document at `(collection, key)`.
    ///
    /// Top-level fields of `document` overwrite the stored ones; replaying
    /// the same upsert leaves the store unchanged.
    Upsert {
        request_id: u64,
        collection: String,
        key: String,
        document: Value,
    },

    /// Fetch the document at `(collection, key)`.
    Get {
        request_id: u64,
        collection: String,
        key: String,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The upsert was stored.
    Ack { request_id: u64 },

    /// Reply to a get; `document` is null when nothing is stored.
    Document {
        request_id: u64,
        document: Option<Value>,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// The request failed. `request_id` is absent when the frame could not be parsed.
    Error {
        request_id: Option<u64>,
        message: String,
    },
}

impl ClientMessage {
    pub fn upsert(
        request_id: u64,
        collection: impl Into<String>,
        key: impl Into<String>,
        document: Value,
    ) -> Self {
        ClientMessage::Upsert {
            request_id,
            collection: collection.into(),
            key: key.into(),
            document,
        }
    }

    pub fn get(request_id: u64, collection: impl Into<String>, key: impl Into<String>) -> Self {
        ClientMessage::Get {
            request_id,
            collection: collection.into(),
            key: key.into(),
        }
    }

    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn ack(request_id: u64) -> Self {
        ServerMessage::Ack { request_id }
    }

    pub fn document(request_id: u64, document: Option<Value>) -> Self {
        ServerMessage::Document {
            request_id,
            document,
        }
    }

    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    pub fn error(request_id: Option<u64>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            request_id,
            message: message.into(),
        }
    }

    /// The request this message answers, if any. Pongs answer pings, not requests.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ServerMessage::Ack { request_id } | ServerMessage::Document { request_id, .. } => {
                Some(*request_id)
            }
            ServerMessage::Error { request_id, .. } => *request_id,
            ServerMessage::Pong { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
