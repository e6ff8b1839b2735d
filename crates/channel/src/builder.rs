//! Builder pattern for constructing a [`ChannelClient`].

use std::time::Duration;

use sa_domain::config::ChannelConfig;

use crate::client::ChannelClient;
use crate::reconnect::ReconnectPolicy;
use crate::types::ChannelError;

/// Fluent builder for [`ChannelClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use sa_channel::ChannelClientBuilder;
/// # async fn example(session: &sa_auth::SessionStore) {
/// let channel = ChannelClientBuilder::new()
///     .ws_url("wss://agents.example.com/ws")
///     .reconnect_delay(std::time::Duration::from_secs(5))
///     .build()
///     .unwrap()
///     .spawn(session.subscribe());
/// # }
/// ```
pub struct ChannelClientBuilder {
    pub(crate) ws_url: String,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) outbound_buffer: usize,
    pub(crate) max_frame_bytes: usize,
}

impl ChannelClientBuilder {
    pub fn new() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".into(),
            reconnect: ReconnectPolicy::default(),
            outbound_buffer: 64,
            max_frame_bytes: 1024 * 1024, // 1 MB
        }
    }

    /// Start from a loaded [`ChannelConfig`].
    pub fn from_config(cfg: &ChannelConfig) -> Self {
        Self {
            ws_url: cfg.ws_url.clone(),
            reconnect: ReconnectPolicy::from_config(cfg),
            outbound_buffer: cfg.outbound_buffer,
            max_frame_bytes: cfg.max_frame_bytes,
        }
    }

    /// Set the streaming endpoint (e.g. `wss://agents.example.com/ws`).
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    /// Override the whole reconnect policy.
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Use a fixed reconnect delay (default 5s).
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(d);
        self
    }

    /// Outbound frames buffered per connection (default 64).
    pub fn outbound_buffer(mut self, n: usize) -> Self {
        self.outbound_buffer = n;
        self
    }

    // ── Wire limits ──────────────────────────────────────────────────

    /// Maximum inbound frame size (default 1 MB).
    pub fn max_frame_bytes(mut self, n: usize) -> Self {
        self.max_frame_bytes = n;
        self
    }

    /// Build the [`ChannelClient`].
    pub fn build(self) -> Result<ChannelClient, ChannelError> {
        if self.ws_url.is_empty() {
            return Err(ChannelError::Config("ws_url is required".into()));
        }
        if self.outbound_buffer == 0 {
            return Err(ChannelError::Config("outbound_buffer must be > 0".into()));
        }

        Ok(ChannelClient {
            ws_url: self.ws_url,
            reconnect: self.reconnect,
            outbound_buffer: self.outbound_buffer,
            max_frame_bytes: self.max_frame_bytes,
        })
    }
}

impl Default for ChannelClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_is_rejected() {
        let err = ChannelClientBuilder::new().ws_url("").build().err().unwrap();
        assert!(matches!(err, ChannelError::Config(_)));
    }

    #[test]
    fn zero_buffer_is_rejected() {
        assert!(ChannelClientBuilder::new().outbound_buffer(0).build().is_err());
    }

    #[test]
    fn from_config_uses_configured_values() {
        let cfg = ChannelConfig {
            ws_url: "wss://x/ws".into(),
            reconnect_delay_ms: 100,
            ..Default::default()
        };
        let b = ChannelClientBuilder::from_config(&cfg);
        assert_eq!(b.ws_url, "wss://x/ws");
        assert_eq!(b.reconnect.delay, Duration::from_millis(100));
    }
}
