//! # Coord CLI
//!
//! Operator entry point: runs the distributed lock and rate limiter
//! against the configured store.

use clap::Parser;

mod commands;
mod config;
mod telemetry;

use commands::Cli;
use config::AppConfig;
use telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    let store = config.store(cli.memory).await?;

    commands::run(cli.command, store, &config, &mut std::io::stdout()).await
}
