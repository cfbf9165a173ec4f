//! Mockdeck - Collaborative Mockup Editor Relay
//!
//! CLI entry point for the Mockdeck relay server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

/// Relay server for collaborative mockup documents.
#[derive(Debug, Parser)]
#[command(name = "mockdeck", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "MOCKDECK_HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080, env = "MOCKDECK_PORT")]
    port: u16,

    /// SQLite database URL for document storage
    #[arg(
        long,
        default_value = "sqlite:mockdeck.db?mode=rwc",
        env = "DATABASE_URL"
    )]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mockdeck=info,mockdeck_canvas=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting Mockdeck relay v{}", env!("CARGO_PKG_VERSION"));

    server::run(&cli.host, cli.port, &cli.database_url).await
}
