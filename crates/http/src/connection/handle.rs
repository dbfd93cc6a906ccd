use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique connection identifier, displayed as `conn-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared handle used to request the closure of a running connection.
///
/// The connection itself is owned by the task driving it; the registry and any
/// other party only ever hold one of these. Closing flips a watch channel that
/// every pending read or write of the connection is selected against, so the
/// in-flight operation completes as aborted.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    pub fn new(peer_addr: Option<SocketAddr>) -> Self {
        let (closed, _) = watch::channel(false);
        Self { inner: Arc::new(Inner { id: ConnectionId::next(), peer_addr, closed }) }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr
    }

    /// Marks the connection closed. Only the first call returns `true`.
    pub fn close(&self) -> bool {
        self.inner.closed.send_if_modified(|closed| {
            if *closed {
                return false;
            }
            *closed = true;
            true
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        let mut receiver = self.inner.closed.subscribe();
        // the sender lives as long as `self`, so this can't fail
        let _ = receiver.wait_for(|closed| *closed).await;
    }
}
