use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Live channel (WebSocket)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Streaming endpoint; the credential is appended as `?token=`.
    /// Overridden by `SA_WS_URL`.
    #[serde(default = "d_ws_url")]
    pub ws_url: String,
    /// Delay between a connection drop and the next attempt.
    #[serde(default = "d_5000")]
    pub reconnect_delay_ms: u64,
    /// Multiplier applied per consecutive failed attempt. `1.0` keeps the
    /// delay fixed.
    #[serde(default = "d_factor")]
    pub backoff_factor: f64,
    /// Upper bound for the reconnect delay when backing off.
    #[serde(default = "d_5000")]
    pub max_delay_ms: u64,
    /// Consecutive failed attempts before the channel gives up.
    /// `0` means unlimited.
    #[serde(default)]
    pub max_attempts: u32,
    /// Capacity of the per-connection outbound frame buffer.
    #[serde(default = "d_64")]
    pub outbound_buffer: usize,
    /// Inbound text frames above this size are dropped before parsing.
    #[serde(default = "d_1mb")]
    pub max_frame_bytes: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ws_url: d_ws_url(),
            reconnect_delay_ms: 5000,
            backoff_factor: 1.0,
            max_delay_ms: 5000,
            max_attempts: 0,
            outbound_buffer: 64,
            max_frame_bytes: 1024 * 1024,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_ws_url() -> String {
    "ws://localhost:8000/ws".into()
}
fn d_5000() -> u64 {
    5000
}
fn d_factor() -> f64 {
    1.0
}
fn d_64() -> usize {
    64
}
fn d_1mb() -> usize {
    1024 * 1024
}
