use crate::broker::message::Message;
use crate::utils::error::{RelayError, Result};

/// Accumulates raw bytes from a publisher and cuts them into lines.
///
/// Only `\n`-terminated segments are emitted; blank segments are skipped.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line_bytes: usize,
}

impl LineBuffer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes,
        }
    }

    /// Appends `bytes` and returns every message completed by them, in order.
    ///
    /// Fails on any line longer than `max_line_bytes`, terminated or not.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Message>> {
        self.pending.extend_from_slice(bytes);

        let mut messages = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if end - start > self.max_line_bytes {
                return Err(RelayError::LineTooLong {
                    limit: self.max_line_bytes,
                });
            }
            if let Some(message) = Message::from_raw(&self.pending[start..end]) {
                messages.push(message);
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > self.max_line_bytes {
            return Err(RelayError::LineTooLong {
                limit: self.max_line_bytes,
            });
        }
        Ok(messages)
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}
