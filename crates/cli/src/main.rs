use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sa_cli::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    match args.command {
        Command::Login { service, api_key } => {
            init_cli_tracing("warn");
            let (config, _) = cli::load_config()?;
            cli::session::login(&config, &service, api_key.as_deref()).await
        }
        Command::Logout => {
            init_cli_tracing("warn");
            let (config, _) = cli::load_config()?;
            cli::session::logout(&config)
        }
        Command::Status { json } => {
            init_cli_tracing("warn");
            let (config, _) = cli::load_config()?;
            cli::session::status(&config, json).await
        }
        Command::Listen => {
            init_cli_tracing("info");
            let (config, _) = cli::load_config()?;
            cli::live::listen(&config).await
        }
        Command::Send { frame, wait_secs } => {
            init_cli_tracing("warn");
            let (config, _) = cli::load_config()?;
            cli::live::send(&config, &frame, Duration::from_secs(wait_secs)).await
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = cli::load_config()?;
            cli::config::show(&config)
        }
    }
}

/// Initialize compact stderr-only tracing.
///
/// `RUST_LOG` wins; otherwise `default_level` applies so diagnostic output
/// never pollutes stdout.
fn init_cli_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
