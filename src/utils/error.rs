//! The `error` module defines the error type used within the `linecast` relay.
//!
//! Only `Bind` and `Config` ever reach the process level. Everything else is
//! contained to the task of the connection that produced it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake not received within {0:?}")]
    HandshakeTimeout(std::time::Duration),

    #[error("connection closed before handshake")]
    HandshakeClosed,

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, RelayError>;
