use clap::Parser;
use interior_tracker::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and SUPABASE_* are picked up locally
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("interior_tracker=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
