// Cafe Finder
// Main entry point for the cafe binary

use clap::Parser;
use cafe_engine::cli::{Cli, Command};
use cafe_engine::config::Config;
use cafe_engine::handlers::{handle_ask, handle_chat, handle_doctor, handle_secret, OutputFormat};
use cafe_engine::telemetry::{init_telemetry, init_telemetry_with_level};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Secret management must work even when the config file is broken
    if let Command::Secret { action } = cli.command {
        init_telemetry_with_level(cli.log.as_deref().unwrap_or("warn"));
        return handle_secret(action, format).await.map(|()| ExitCode::SUCCESS);
    }

    // Load configuration (or use custom path if provided)
    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // --log overrides the config file; RUST_LOG overrides both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Cafe Finder v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    match cli.command {
        Command::Ask { utterance } => {
            tracing::info!("Answering one question");
            handle_ask(utterance, &config, format).await
        }

        Command::Chat => {
            tracing::info!("Starting interactive chat");
            handle_chat(&config, format).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Secret { .. } => Ok(ExitCode::SUCCESS),
    }
}
