//! Minimal relay clients.
//!
//! `run_sender` forwards lines from any buffered input to the relay and
//! `run_receiver` copies every delivered line to an output sink. They speak
//! the same protocol as the desktop sender and the keystroke receiver, which
//! makes them handy for smoke tests and scripting.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::broker::message::Message;
use crate::utils::error::Result;

pub const SENDER_TOKEN: &str = "sender";
pub const RECEIVER_TOKEN: &str = "receiver";

/// Connects as a publisher and sends each non-blank line of `input`.
///
/// Returns the number of lines sent once `input` is exhausted.
pub async fn run_sender<R>(addr: &str, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("{SENDER_TOKEN}\n").as_bytes())
        .await?;
    info!("Connected to {} as {}", addr, SENDER_TOKEN);

    let mut sent = 0;
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let Some(message) = Message::new(&line) else {
            continue;
        };
        stream.write_all(&message.to_wire()).await?;
        debug!("Sent: {}", message);
        sent += 1;
    }

    stream.shutdown().await?;
    Ok(sent)
}

/// Connects as a subscriber and writes every delivered line to `output`
/// until the relay closes the connection.
///
/// Returns the number of lines received.
pub async fn run_receiver<W>(addr: &str, mut output: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("{RECEIVER_TOKEN}\n").as_bytes())
        .await?;
    info!("Connected to {} as {}, waiting for lines", addr, RECEIVER_TOKEN);

    let mut received = 0;
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        received += 1;
    }

    info!("Connection closed by relay");
    Ok(received)
}
