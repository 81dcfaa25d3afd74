//! Novella Server - upload EPUBs and manage bilingual novels over HTTP

use anyhow::Result;
use novella_server::{routes, state};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "novella_server=debug,novella_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = state::ServerConfig::from_env()?;
    let addr = config.bind;
    tracing::info!(storage = %config.storage_path.display(), "Loading library");

    // Create application state
    let state = state::AppState::new(config).await?;

    // Build router
    let app = routes::create_router(state);

    // Start server
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
