pub mod config;
pub mod live;
pub mod session;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sa_auth::{create_storage, RestAuthClient, SessionStore};
use sa_domain::config::Config;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SA_CONFIG";

/// SerialAgent client: sign in and follow the live channel.
#[derive(Debug, Parser)]
#[command(name = "sa-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with an API key or a service-issued token.
    Login {
        /// Service to request a token for (ignored with --api-key).
        #[arg(long, default_value = "github")]
        service: String,
        /// Sign in with an API key instead of requesting a token.
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Drop the stored credential.
    Logout,
    /// Verify the stored credential and print the session state.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Open the live channel and print each message until Ctrl-C.
    Listen,
    /// Open the live channel, send one JSON frame, and exit.
    Send {
        /// The frame to send, as JSON (e.g. '{"type":"ping"}').
        frame: String,
        /// Seconds to wait for the channel to open.
        #[arg(long, default_value_t = 10)]
        wait_secs: u64,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `SA_CONFIG` (or
/// `config.toml` by default), with `SA_API_URL` / `SA_WS_URL` applied.
/// Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".into());
    let mut config = load_config_from(&config_path)?;
    config.apply_env();
    Ok((config, config_path))
}

/// Load a config file without environment overrides.
pub fn load_config_from(config_path: &str) -> anyhow::Result<Config> {
    Config::load(config_path).map_err(|e| anyhow::anyhow!("{e}"))
}

/// Build the session store for `config` without touching the backend.
pub fn build_session(config: &Config) -> anyhow::Result<SessionStore> {
    let api = Arc::new(RestAuthClient::new(&config.api)?);
    let storage = create_storage(&config.storage)?;
    Ok(SessionStore::new(api, storage))
}

/// Build the session store for `config` and restore any stored credential.
pub async fn open_session(config: &Config) -> anyhow::Result<SessionStore> {
    let session = build_session(config)?;
    session.initialize().await;
    Ok(session)
}
