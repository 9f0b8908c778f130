use std::fmt;
use std::sync::Arc;

/// Represents one relayed line of text.
///
/// A message is trimmed and never empty. It carries no identity beyond its
/// content and is shared, not copied, across every subscriber it is sent to.
/// On the wire it is terminated by a single `\n`, in memory it is not.
///
/// # Example
///
/// ```rust
/// use linecast::broker::message::Message;
///
/// let msg = Message::new("  Hello \r").unwrap();
/// assert_eq!(msg.as_str(), "Hello");
/// assert_eq!(msg.to_wire(), b"Hello\n");
/// assert!(Message::new("   ").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Arc<str>);

impl Message {
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    /// Builds a message from raw line bytes, replacing invalid UTF-8.
    pub fn from_raw(bytes: &[u8]) -> Option<Self> {
        Self::new(&String::from_utf8_lossy(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.0.len() + 1);
        wire.extend_from_slice(self.0.as_bytes());
        wire.push(b'\n');
        wire
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
