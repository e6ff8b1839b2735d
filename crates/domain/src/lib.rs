//! Shared types for the SerialAgent client crates.
//!
//! Holds the configuration model, the shared error type, and the
//! structured trace events emitted by the session store and the live
//! channel.

pub mod config;
pub mod error;
pub mod trace;
