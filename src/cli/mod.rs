use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::SupabaseAuth;
use crate::config::{self, AppConfig};
use crate::database::{DatabaseManager, PgRepository};
use crate::services::SupabaseStorage;
use crate::AppState;

#[derive(Parser)]
#[command(name = "interior-tracker")]
#[command(about = "Interior Tracker API - projects, expenses and photos for interior-design work")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config();
    info!("Interior Tracker API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Migrate => migrate(config).await,
    }
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
    Ok(())
}

async fn serve(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("interior-tracker/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let auth = SupabaseAuth::from_config(&config.supabase, http.clone())?;
    let storage = SupabaseStorage::from_config(&config.supabase, http)?;

    let state = AppState::new(
        config,
        Arc::new(PgRepository::new(pool)),
        Arc::new(auth),
        Arc::new(storage),
    );
    let app = crate::app(state, &config.security.cors_origins);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.server.port));
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves when `signal` fires. A listener that fails to install never
/// resolves, so the server keeps running.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
