//! TCP transport
//!
//! This file implements the relay's listener and the lifecycle of every
//! accepted connection. Responsibilities:
//! - Accept TCP connections and spawn one task per connection
//! - Read the handshake and classify the connection as publisher or subscriber
//! - Register the connection with the `Registry` and run its role's read loop
//! - Unregister the connection when it closes, before its socket is released
//!
//! Each connection moves through `Accepted -> Classifying -> Publisher |
//! Subscriber -> Closed`. Errors are logged and contained to the connection's
//! task; only a failure to bind escapes to the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::broker::{Broadcaster, Member, Registry};
use crate::client::{PeerInfo, Role, Subscriber};
use crate::config::{RelaySettings, Settings};
use crate::transport::framing::LineBuffer;
use crate::transport::handshake::{Classification, read_handshake};
use crate::utils::error::{RelayError, Result};

const READ_CHUNK: usize = 4096;

/// A bound relay, ready to accept connections.
pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    settings: RelaySettings,
}

impl RelayServer {
    pub async fn bind(addr: &str, settings: RelaySettings) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            settings,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self) {
        let broadcaster =
            Broadcaster::new(self.registry.clone(), self.settings.write_timeout());
        let slots = Arc::new(Semaphore::new(self.settings.connection_limit()));
        let settings = Arc::new(self.settings);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let Ok(permit) = slots.clone().try_acquire_owned() else {
                warn!(
                    "Rejecting {}: {} connections already open",
                    addr,
                    settings.connection_limit()
                );
                continue;
            };

            let registry = self.registry.clone();
            let broadcaster = broadcaster.clone();
            let settings = settings.clone();

            tokio::spawn(async move {
                handle_connection(stream, addr, registry, broadcaster, &settings).await;
                drop(permit);
            });
        }
    }
}

/// Binds `addr` and serves the relay forever.
pub async fn start_relay_server(addr: String, settings: Settings) -> Result<()> {
    let server = RelayServer::bind(&addr, settings.relay).await?;
    info!("Relay listening on {}", server.local_addr()?);
    server.run().await;
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    settings: &RelaySettings,
) {
    let peer = PeerInfo::new(addr);
    info!("{} connected from {}", peer.id, addr);

    let (mut reader, writer) = stream.into_split();

    let handshake = match read_handshake(
        &mut reader,
        settings.max_line_bytes,
        settings.handshake_timeout(),
    )
    .await
    {
        Ok(handshake) => handshake,
        Err(e) => {
            warn!("Handshake from {} failed: {}", addr, e);
            return;
        }
    };

    let role = match handshake.classification {
        Classification::Publisher => Role::Publisher,
        Classification::Subscriber => Role::Subscriber,
        Classification::Rejected(token) => {
            warn!("Unknown client type from {}: {:?}", addr, token);
            return;
        }
    };
    info!("{} ({}) classified as {}", peer.id, addr, role);

    let outcome = match role {
        Role::Publisher => {
            registry.register(Member::Publisher(peer.clone()));
            let leftover = handshake.leftover;
            publisher_loop(&mut reader, &peer, leftover, &broadcaster, settings).await
        }
        Role::Subscriber => {
            let subscriber = Subscriber::new(peer.clone(), writer);
            registry.register(Member::Subscriber(subscriber.clone()));
            subscriber_loop(&mut reader, &subscriber).await
        }
    };

    if let Err(e) = outcome {
        warn!("{} ({}) error: {}", peer.id, addr, e);
    }

    registry.unregister(&peer.id);
    info!(
        "{} ({}) disconnected after {}s",
        peer.id,
        addr,
        peer.session_duration().num_seconds()
    );
}

async fn publisher_loop<R>(
    reader: &mut R,
    peer: &PeerInfo,
    leftover: Vec<u8>,
    broadcaster: &Broadcaster,
    settings: &RelaySettings,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineBuffer::new(settings.max_line_bytes);
    relay_lines(&mut lines, &leftover, peer, broadcaster).await?;

    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if !lines.pending().is_empty() {
                debug!(
                    "{} closed with {} unterminated bytes, discarded",
                    peer.id,
                    lines.pending().len()
                );
            }
            return Ok(());
        }
        relay_lines(&mut lines, &chunk[..n], peer, broadcaster).await?;
    }
}

async fn relay_lines(
    lines: &mut LineBuffer,
    bytes: &[u8],
    peer: &PeerInfo,
    broadcaster: &Broadcaster,
) -> Result<()> {
    for message in lines.push(bytes)? {
        let delivered = broadcaster.publish(&message).await;
        debug!(
            "{} published {:?} to {} subscribers",
            peer.id,
            message.as_str(),
            delivered
        );
    }
    Ok(())
}

async fn subscriber_loop<R>(reader: &mut R, subscriber: &Subscriber) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        tokio::select! {
            read = reader.read(&mut chunk) => {
                // Anything a subscriber sends after the handshake is ignored.
                if read? == 0 {
                    return Ok(());
                }
            }
            _ = subscriber.closed() => {
                debug!("{} closed after a failed delivery", subscriber.id());
                return Ok(());
            }
        }
    }
}
