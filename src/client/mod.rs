//! The `client` module defines the server-side representation of a connected peer.
//!
//! It provides the identity and role of an accepted connection and the
//! `Subscriber` handle the registry keeps for fan-out.

pub mod connection;
pub use connection::{ConnectionId, PeerInfo, Role, Subscriber};
