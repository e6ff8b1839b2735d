use serde::Serialize;

/// Structured trace events emitted across the SerialAgent client crates.
///
/// Credentials never appear in these events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    AuthCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    CredentialRestored {
        verified: bool,
    },
    CredentialRejected {
        reason: String,
    },
    LoginCompleted {
        method: String,
        service: Option<String>,
        expires_in: Option<u64>,
    },
    LoggedOut,
    ChannelOpened {
        connection: u64,
    },
    ChannelClosed {
        connection: u64,
        deliberate: bool,
        messages_received: u64,
    },
    ReconnectScheduled {
        attempt: u32,
        delay_ms: u64,
    },
    FrameDropped {
        reason: String,
        bytes: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sa_event");
    }
}
