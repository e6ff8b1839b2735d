//! `listen` and `send`.

use std::time::Duration;

use anyhow::Context;
use sa_auth::SessionStore;
use sa_channel::{ChannelClientBuilder, ChannelState, LiveChannel};
use sa_domain::config::Config;
use tokio::sync::broadcast::error::RecvError;

use super::open_session;

async fn open_channel(config: &Config) -> anyhow::Result<(SessionStore, LiveChannel)> {
    let session = open_session(config).await?;
    if !session.is_authenticated() {
        anyhow::bail!("not logged in; run `sa-cli login` first");
    }
    let channel = ChannelClientBuilder::from_config(&config.channel)
        .build()?
        .spawn(session.subscribe());
    Ok((session, channel))
}

/// Print every inbound message as one JSON line until Ctrl-C.
pub async fn listen(config: &Config) -> anyhow::Result<()> {
    // The session must outlive the channel: dropping it ends the channel.
    let (_session, channel) = open_channel(config).await?;
    let mut messages = channel.subscribe();

    loop {
        tokio::select! {
            msg = messages.recv() => match msg {
                Ok(msg) => println!("{}", serde_json::to_string(&msg)?),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "output fell behind, messages skipped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.shutdown().await;
    Ok(())
}

/// Send one frame once the channel is open.
pub async fn send(config: &Config, frame: &str, wait: Duration) -> anyhow::Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(frame).context("frame must be valid JSON")?;

    let (_session, channel) = open_channel(config).await?;
    channel
        .wait_for_state(ChannelState::Open, wait)
        .await
        .context("live channel did not open")?;
    channel.send(&value)?;

    // Shutdown flushes the queued frame before closing.
    channel.shutdown().await;
    println!("Sent");
    Ok(())
}
