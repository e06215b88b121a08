//! Hot Updater Server - Main Application Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use config::{ConfigLoader, ConfigValidator, LoggingConfig};
use std::{env, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod database;
mod store;

use app::Application;

/// OTA update resolution server for React Native bundles
#[derive(Debug, Parser)]
#[command(name = "hot-updater-server", version, about)]
struct Cli {
    /// Path to the YAML configuration file (falls back to CONFIG_PATH, then config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write an example configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_example_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.write_example_config {
        ConfigLoader::create_example(&path).context("Failed to write example configuration")?;
        println!("Example configuration written to {}", path.display());
        return Ok(());
    }

    // Missing .env files are fine
    let dotenv_result = dotenv::dotenv();

    let config_path = cli.config.unwrap_or_else(|| {
        PathBuf::from(env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string()))
    });
    let config = ConfigLoader::load(&config_path).context("Failed to load configuration")?;

    init_logging(&config.logging)?;

    if let Err(e) = dotenv_result {
        if !e.to_string().contains("No such file or directory") {
            warn!("Could not load .env file: {}", e);
        }
    }

    info!("Starting Hot Updater Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path.display());

    let report = ConfigValidator::validate(&config)?;
    for issue in &report.warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }
    info!("{}", report.summary());

    let mut app = Application::new(config)
        .await
        .context("Failed to create application")?;

    let shutdown_signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    info!("Application starting...");
    tokio::select! {
        result = app.run() => {
            if let Err(e) = result {
                tracing::error!("Application error: {:#}", e);
                return Err(e);
            }
        }
        _ = shutdown_signal => {
            info!("Initiating graceful shutdown...");
            app.shutdown().await?;
        }
    }

    info!("Hot Updater Server shutdown complete");
    Ok(())
}

/// Initialize logging; RUST_LOG overrides the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format.as_str() {
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    info!(level = %logging.level, format = %logging.format, "Logging initialized");

    if logging.level == "trace" || logging.level == "debug" {
        warn!("Debug/trace logging enabled - may impact performance in production");
    }

    Ok(())
}
