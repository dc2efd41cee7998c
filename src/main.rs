//! # Marketplace API Main Entry Point
//!
//! ```bash
//! marketplace            # serve (default)
//! marketplace migrate    # apply migrations and exit
//! marketplace seed       # apply migrations, seed categories and the super-admin
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marketplace::{
    config::{AppConfig, ConfigLoader},
    db,
    payments::{PaymentGateway, StripeClient},
    seeds,
    server::{AppState, run_server},
    telemetry,
};

#[derive(Parser)]
#[command(name = "marketplace")]
#[command(author, version, about = "Multi-tenant digital goods marketplace API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Seed the category tree and the configured super-admin
    Seed,
}

fn payment_gateway(config: &AppConfig) -> Arc<dyn PaymentGateway> {
    Arc::new(StripeClient::from_config(&config.stripe))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    telemetry::init_tracing(&config).context("initializing tracing")?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::Seed => {
            let gateway = config
                .stripe
                .secret_key
                .as_deref()
                .is_some_and(|key| !key.is_empty())
                .then(|| payment_gateway(&config));
            seeds::run(&db, &config, gateway.as_deref()).await
        }
        Command::Serve => {
            let state = AppState {
                db,
                payments: payment_gateway(&config),
                config: Arc::new(config),
            };
            run_server(state).await
        }
    }
}
