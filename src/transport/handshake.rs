//! Role classification
//!
//! The first line a client sends fixes its role for the lifetime of the
//! connection. Tokens are compared after trimming, case-insensitively.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::client::Role;
use crate::utils::error::{RelayError, Result};

const READ_CHUNK: usize = 1024;

/// Outcome of the handshake, decided once and never reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Publisher,
    Subscriber,
    Rejected(String),
}

impl Classification {
    pub fn role(&self) -> Option<Role> {
        match self {
            Classification::Publisher => Some(Role::Publisher),
            Classification::Subscriber => Some(Role::Subscriber),
            Classification::Rejected(_) => None,
        }
    }
}

pub fn classify(token: &str) -> Classification {
    let token = token.trim().to_lowercase();
    match token.as_str() {
        "sender" | "publisher" => Classification::Publisher,
        "receiver" | "subscriber" => Classification::Subscriber,
        _ => Classification::Rejected(token),
    }
}

/// The handshake line together with whatever arrived after it in the same reads.
#[derive(Debug)]
pub struct Handshake {
    pub classification: Classification,
    pub leftover: Vec<u8>,
}

/// Reads the handshake line from a freshly accepted connection.
///
/// The line ends at the first `\n`. Older senders write the bare token with
/// no terminator, so a buffer that already equals a known token is accepted
/// as is. End-of-stream after a partial line classifies what was received.
pub async fn read_handshake<R>(
    reader: &mut R,
    max_len: usize,
    limit: Option<Duration>,
) -> Result<Handshake>
where
    R: AsyncRead + Unpin,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, read_line(reader, max_len))
            .await
            .map_err(|_| RelayError::HandshakeTimeout(limit))?,
        None => read_line(reader, max_len).await,
    }
}

async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<Handshake>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.iter().all(u8::is_ascii_whitespace) {
                return Err(RelayError::HandshakeClosed);
            }
            return Ok(Handshake {
                classification: classify(&String::from_utf8_lossy(&buf)),
                leftover: Vec::new(),
            });
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let leftover = buf.split_off(pos + 1);
            return Ok(Handshake {
                classification: classify(&String::from_utf8_lossy(&buf)),
                leftover,
            });
        }

        let pending = classify(&String::from_utf8_lossy(&buf));
        if pending.role().is_some() {
            return Ok(Handshake {
                classification: pending,
                leftover: Vec::new(),
            });
        }

        if buf.len() > max_len {
            return Err(RelayError::LineTooLong { limit: max_len });
        }
    }
}
