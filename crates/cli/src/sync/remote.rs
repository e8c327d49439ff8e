// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store abstraction and its WebSocket client.
//!
//! Provides a trait-based remote layer that enables:
//! - A real WebSocket client for production
//! - An in-memory store for unit testing

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use ps_core::protocol::{ClientMessage, ServerMessage};

/// Error type for remote store calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No live connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// No reply within the request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused the request.
    #[error("rejected by remote: {0}")]
    Rejected(String),

    /// The reply made no sense for the request.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteStore`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// The store of record, as seen by the operation executor.
///
/// Upserts are insert-or-merge by `(collection, key)`: replaying the same
/// document converges to the same stored state.
pub trait RemoteStore: Send + Sync {
    fn upsert<'a>(&'a self, collection: &'a str, key: &'a str, document: Value)
        -> RemoteFuture<'a, ()>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for Arc<R> {
    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        document: Value,
    ) -> RemoteFuture<'a, ()> {
        (**self).upsert(collection, key, document)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<ServerMessage>>>>;

/// A live WebSocket connection to the store of record.
///
/// Replies are matched to requests by `request_id` (or ping id), so
/// concurrent callers may share one connection.
pub struct WebSocketRemote {
    sink: Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    pending_pings: Pending,
    next_id: AtomicU64,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
    reader: JoinHandle<()>,
}

impl WebSocketRemote {
    /// Connect to `url`, giving up after `request_timeout`.
    pub async fn connect(url: &str, request_timeout: Duration) -> RemoteResult<Self> {
        let connect = tokio_tungstenite::connect_async(url);
        let (ws, _) = tokio::time::timeout(request_timeout, connect)
            .await
            .map_err(|_| RemoteError::Timeout(request_timeout))?
            .map_err(|e| RemoteError::ConnectionFailed(e.to_string()))?;

        let (sink, stream) = ws.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let pending_pings: Pending = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&pending_pings),
            Arc::clone(&connected),
        ));

        debug!(url, "connected to remote");
        Ok(WebSocketRemote {
            sink: Mutex::new(sink),
            pending,
            pending_pings,
            next_id: AtomicU64::new(1),
            connected,
            request_timeout,
            reader,
        })
    }

    /// Returns false once the server closed the connection or a read failed.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Round-trips a protocol ping.
    pub async fn ping(&self) -> RemoteResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self
            .send_and_wait(&self.pending_pings, id, ClientMessage::ping(id))
            .await?
        {
            ServerMessage::Pong { .. } => Ok(()),
            other => Err(RemoteError::Protocol(format!(
                "expected pong, got {other:?}"
            ))),
        }
    }

    /// Fetches a document from the store.
    pub async fn get(&self, collection: &str, key: &str) -> RemoteResult<Option<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self
            .send_and_wait(&self.pending, id, ClientMessage::get(id, collection, key))
            .await?
        {
            ServerMessage::Document { document, .. } => Ok(document),
            ServerMessage::Error { message, .. } => Err(RemoteError::Rejected(message)),
            other => Err(RemoteError::Protocol(format!(
                "expected document, got {other:?}"
            ))),
        }
    }

    /// Closes the connection.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::Release);
        let mut sink = self.sink.lock().await;
        let _ = sink.close().await;
    }

    async fn send_and_wait(
        &self,
        waiters: &Pending,
        id: u64,
        msg: ClientMessage,
    ) -> RemoteResult<ServerMessage> {
        if !self.is_connected() {
            return Err(RemoteError::ConnectionClosed);
        }

        let json = msg
            .to_json()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        waiters.lock().await.insert(id, tx);
        // The reader may have exited and cleared the waiters since the check above
        if !self.is_connected() {
            waiters.lock().await.remove(&id);
            return Err(RemoteError::ConnectionClosed);
        }

        let sent = {
            let mut sink = self.sink.lock().await;
            match sink.send(Message::Text(json.into())).await {
                // Flush so a dead socket shows up here rather than as a timeout
                Ok(()) => sink.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = sent {
            waiters.lock().await.remove(&id);
            self.connected.store(false, Ordering::Release);
            return Err(RemoteError::ConnectionFailed(e.to_string()));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RemoteError::ConnectionClosed),
            Err(_) => {
                waiters.lock().await.remove(&id);
                Err(RemoteError::Timeout(self.request_timeout))
            }
        }
    }
}

impl Drop for WebSocketRemote {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl RemoteStore for WebSocketRemote {
    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        document: Value,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let msg = ClientMessage::upsert(id, collection, key, document);
            match self.send_and_wait(&self.pending, id, msg).await? {
                ServerMessage::Ack { .. } => Ok(()),
                ServerMessage::Error { message, .. } => Err(RemoteError::Rejected(message)),
                other => Err(RemoteError::Protocol(format!("expected ack, got {other:?}"))),
            }
        })
    }
}

/// Routes replies to their waiters until the stream ends.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: Pending,
    pending_pings: Pending,
    connected: Arc<AtomicBool>,
) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "remote connection failed");
                break;
            }
        };

        let msg = match ServerMessage::from_json(text.as_str()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable frame from remote");
                continue;
            }
        };

        let waiter = match &msg {
            ServerMessage::Pong { id } => pending_pings.lock().await.remove(id),
            other => match other.request_id() {
                Some(id) => pending.lock().await.remove(&id),
                None => {
                    warn!(?other, "remote reported an error without a request id");
                    None
                }
            },
        };
        match waiter {
            Some(tx) => {
                let _ = tx.send(msg);
            }
            None => debug!("dropping reply with no waiter"),
        }
    }

    connected.store(false, Ordering::Release);
    // Waking every waiter with a closed channel fails them fast
    pending.lock().await.clear();
    pending_pings.lock().await.clear();
}

/// The connection currently held by the link supervisor, if any.
///
/// Calls made while no connection is held fail with
/// [`RemoteError::ConnectionClosed`].
#[derive(Clone, Default)]
pub struct RemoteSlot {
    current: Arc<RwLock<Option<Arc<WebSocketRemote>>>>,
}

impl RemoteSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, remote: Arc<WebSocketRemote>) {
        *self.current.write().await = Some(remote);
    }

    pub async fn clear(&self) -> Option<Arc<WebSocketRemote>> {
        self.current.write().await.take()
    }

    pub async fn current(&self) -> Option<Arc<WebSocketRemote>> {
        self.current.read().await.clone()
    }
}

impl RemoteStore for RemoteSlot {
    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        document: Value,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let remote = self.current().await.ok_or(RemoteError::ConnectionClosed)?;
            remote.upsert(collection, key, document).await
        })
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
