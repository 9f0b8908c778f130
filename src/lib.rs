//! # Linecast
//!
//! `linecast` is a small real-time line relay built on Tokio. Clients open a
//! plain TCP connection and introduce themselves with a one-line handshake:
//! `sender` connections publish newline-delimited text, and every non-empty
//! line is fanned out to all currently connected `receiver` connections.
//!
//! ## Core Modules
//!
//! - `broker`: The shared registry of publishers and subscribers and the broadcaster that fans lines out.
//! - `client`: Server-side representation of an accepted connection (identity, role, writer handle).
//! - `config`: Handles loading and managing relay configuration.
//! - `peer`: Minimal sender and receiver clients, useful for smoke tests.
//! - `transport`: The TCP listener, handshake classification and line framing.
//! - `utils`: Shared utilities such as error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod peer;
pub mod transport;
pub mod utils;
