use anyhow::Result;
use atrium_cli::{Cli, Command};
use atrium_core::config::{AppConfig, LoadOptions};
use clap::Parser;

fn init_logging(config: &AppConfig) {
    use atrium_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(LoadOptions { config_path: cli.config.clone(), require_file: false })?;
    init_logging(&config);

    match cli.command {
        Command::Ask { question } => {
            atrium_cli::commands::ask(&config, &question.join(" ")).await?;
        }
        Command::Chat => {
            atrium_cli::commands::chat(&config).await?;
        }
        Command::Profile => {
            atrium_cli::commands::profile(&config)?;
        }
    }
    Ok(())
}
