//! Channel state, the message log, and errors.

use sa_protocol::ChannelMessage;

/// Lifecycle of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No credential; nothing to connect with.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Connected; frames flow both ways.
    Open,
    /// Connection dropped; a reconnect is scheduled.
    Retrying,
    /// Reconnect attempts exhausted; waits for a new credential.
    Failed,
    /// Shut down.  Never leaves this state.
    Terminated,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Retrying => "retrying",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of every accepted inbound message.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    entries: Vec<ChannelMessage>,
}

impl MessageLog {
    pub fn push(&mut self, msg: ChannelMessage) {
        self.entries.push(msg);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChannelMessage> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[ChannelMessage] {
        &self.entries
    }
}

/// Live channel errors.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("config: {0}")]
    Config(String),
    #[error("live channel is not connected")]
    NotConnected,
    #[error("outbound buffer full")]
    OutboundFull,
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("timed out waiting for state {0}")]
    Timeout(ChannelState),
    #[error("shutdown")]
    Shutdown,
}
