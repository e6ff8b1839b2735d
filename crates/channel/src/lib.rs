//! Authenticated live channel for SerialAgent clients.
//!
//! The channel follows the session credential published by
//! [`sa_auth::SessionStore`]: while a credential is present it keeps a
//! single WebSocket open to the streaming endpoint, and while none is
//! present it stays idle.  Every inbound frame that validates as a
//! [`ChannelMessage`] is appended to an in-memory log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  watch<Option<Credential>>  ┌──────────────────────┐
//! │ SessionStore │ ──────────────────────────▶ │ supervisor task      │
//! └──────────────┘                             │  connect ─▶ read/write│
//!                                              │  ▲          │         │
//!                                              │  └─ retry ◀─┘         │
//!                                              └──────────┬───────────┘
//!                                                         │ log + broadcast
//!                                                         ▼
//!                                                   LiveChannel handle
//! ```
//!
//! # Connection rules
//!
//! 1. Connect with `?token=<credential>` on the configured URL.
//! 2. A credential change closes the current socket deliberately and,
//!    if a credential remains, reconnects immediately with it.
//! 3. A connection dropped by the server or network schedules exactly
//!    one reconnect (fixed 5s by default) that reads the credential
//!    current at fire time.
//! 4. Logout or shutdown cancels any pending reconnect.

pub mod builder;
pub mod client;
pub mod reconnect;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::ChannelClientBuilder;
pub use client::{ChannelClient, LiveChannel};
pub use reconnect::ReconnectPolicy;
pub use types::{ChannelError, ChannelState, MessageLog};

// Re-export the frame type so consumers never need to import sa-protocol directly.
pub use sa_protocol::ChannelMessage;
