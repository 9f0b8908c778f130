use std::fmt;
use std::net::SocketAddr;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use uuid::Uuid;

use crate::broker::message::Message;

/// Unique identifier of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Role fixed by the handshake for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Publisher,
    Subscriber,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Publisher => f.write_str("publisher"),
            Role::Subscriber => f.write_str("subscriber"),
        }
    }
}

/// Identity and bookkeeping for an accepted connection.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

impl PeerInfo {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            addr,
            connected_at: Utc::now(),
        }
    }

    /// Wall-clock time since the connection was accepted.
    pub fn session_duration(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle to a registered subscriber.
///
/// Cloning is cheap: clones share the same writer and close signal. The
/// writer mutex serializes lines coming from different publishers so they
/// never interleave mid-line; it is never taken while the registry lock is held.
#[derive(Clone)]
pub struct Subscriber {
    pub info: PeerInfo,
    writer: Arc<Mutex<BoxedWriter>>,
    failed: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

impl Subscriber {
    pub fn new<W>(info: PeerInfo, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            info,
            writer: Arc::new(Mutex::new(Box::new(writer))),
            failed: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.info.id
    }

    /// Writes `message` followed by `\n` and flushes it, giving up after `limit`.
    ///
    /// A write that fails or times out may leave part of a line on the
    /// socket, so the first failure marks the writer as unusable before the
    /// lock is released. Every later `send` fails without touching the socket.
    pub async fn send(&self, message: &Message, limit: Duration) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        if self.failed.load(Ordering::Acquire) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "subscriber writer failed earlier",
            ));
        }

        let wire = message.to_wire();
        let result = match timeout(limit, async {
            writer.write_all(&wire).await?;
            writer.flush().await
        })
        .await
        {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write timed out after {limit:?}"),
            )),
        };

        if result.is_err() {
            self.failed.store(true, Ordering::Release);
        }
        result
    }

    /// True once a write has failed; the subscriber gets nothing more.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Asks the task owning this subscriber's socket to tear it down.
    pub fn close(&self) {
        // notify_one keeps a permit, so a close issued before the task waits is not lost
        self.closed.notify_one();
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("info", &self.info)
            .field("writer", &"dyn AsyncWrite")
            .finish()
    }
}
