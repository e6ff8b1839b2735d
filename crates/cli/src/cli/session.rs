//! `login`, `logout` and `status`.

use sa_domain::config::Config;
use serde_json::json;

use super::{build_session, open_session};

pub async fn login(config: &Config, service: &str, api_key: Option<&str>) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let outcome = session.login(service, api_key).await?;

    match outcome.expires_in {
        Some(secs) => println!("Logged in (token expires in {secs}s)"),
        None => println!("Logged in"),
    }
    Ok(())
}

/// Clear the stored credential.  The backend is not contacted.
pub fn logout(config: &Config) -> anyhow::Result<()> {
    let session = build_session(config)?;
    session.logout();
    println!("Logged out");
    Ok(())
}

/// Verify the stored credential and print the result.  Never prints the
/// credential itself.
pub async fn status(config: &Config, as_json: bool) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let identity = session.identity();

    if as_json {
        let out = json!({
            "authenticated": session.is_authenticated(),
            "user": identity.as_ref().and_then(|i| i.user.clone()),
            "scopes": identity.as_ref().map(|i| i.scopes.clone()).unwrap_or_default(),
            "api_url": config.api.base_url,
            "ws_url": config.channel.ws_url,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !session.is_authenticated() {
        println!("Not logged in ({})", config.api.base_url);
        return Ok(());
    }

    println!("Logged in ({})", config.api.base_url);
    if let Some(identity) = identity {
        if let Some(user) = identity.user {
            println!("  user:   {user}");
        }
        if !identity.scopes.is_empty() {
            println!("  scopes: {}", identity.scopes.join(", "));
        }
    }
    Ok(())
}
