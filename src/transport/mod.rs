//! The `transport` module is responsible for handling network communication
//! with clients over plain TCP.
//!
//! It defines the newline-delimited wire protocol: a one-line handshake that
//! fixes each connection's role, followed by UTF-8 text lines. It also runs
//! the listener that owns every connection's lifecycle.

pub mod framing;
pub mod handshake;
pub mod tcp;

pub use tcp::{RelayServer, start_relay_server};
