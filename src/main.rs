//! # Sponsor Profile Main Entry Point
//!
//! Loads configuration, prepares the database and serves the API.

use std::path::PathBuf;

use clap::Parser;
use sponsor_profile::{
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    server::run_server,
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "sponsor-profile", version, about = "Sponsor Profile API server")]
struct Cli {
    /// Directory holding the layered `.env` files
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_base_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "configuration loaded");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = init_pool(&config).await?;
    run_migrations(&db).await?;

    run_server(config, db).await
}
