//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `linecast` application.
//!
//! It centralizes the relay's error type and the tracing subscriber setup.

pub mod error;
pub mod logging;

pub use error::RelayError;
