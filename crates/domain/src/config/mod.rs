mod api;
mod channel;
mod storage;

pub use api::*;
pub use channel::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable overriding [`ApiConfig::base_url`].
pub const API_URL_ENV: &str = "SA_API_URL";
/// Environment variable overriding [`ChannelConfig::ws_url`].
pub const WS_URL_ENV: &str = "SA_WS_URL";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Read a TOML config file, or return defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Apply `SA_API_URL` / `SA_WS_URL` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply URL overrides using an arbitrary variable lookup.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe out the configured URL.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(base_url = %url, "api.base_url overridden from environment");
            self.api.base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(ws_url = %url, "channel.ws_url overridden from environment");
            self.channel.ws_url = url;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.api.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "api.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !has_scheme(&self.api.base_url, &["http://", "https://"]) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "api.base_url".into(),
                message: "base_url must start with http:// or https://".into(),
            });
        }

        if self.channel.ws_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.ws_url".into(),
                message: "ws_url must not be empty".into(),
            });
        } else if !has_scheme(&self.channel.ws_url, &["ws://", "wss://"]) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.ws_url".into(),
                message: "ws_url must start with ws:// or wss://".into(),
            });
        }

        if self.channel.reconnect_delay_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.reconnect_delay_ms".into(),
                message: "a zero delay reconnects in a tight loop while the server is down".into(),
            });
        }

        if self.channel.backoff_factor < 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.backoff_factor".into(),
                message: "backoff_factor must be >= 1.0".into(),
            });
        }

        if self.channel.max_delay_ms < self.channel.reconnect_delay_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.max_delay_ms".into(),
                message: "max_delay_ms is below reconnect_delay_ms and is ignored"
                    .into(),
            });
        }

        if self.channel.outbound_buffer == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.outbound_buffer".into(),
                message: "outbound_buffer must be greater than 0".into(),
            });
        }

        if self.storage.key.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "storage.key".into(),
                message: "key must not be empty".into(),
            });
        }

        if self.storage.backend == StorageBackend::Memory {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "storage.backend".into(),
                message: "memory backend does not survive restarts".into(),
            });
        }

        errors
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    let lower = url.to_ascii_lowercase();
    schemes.iter().any(|s| lower.starts_with(s))
}
