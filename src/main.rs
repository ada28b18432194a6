use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use recipe_search::api;
use recipe_search::config::Config;
use recipe_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "Cache TTL: {}s, candidate limit: {}, browse limit: {}",
        config.cache_ttl_secs,
        config.candidate_limit,
        config.browse_limit
    );

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/api/search/dbfts", post(api::search::search_dbfts))
        .route("/api/search/recipes", get(api::search::search_recipes))
        .route("/api/health", get(api::health::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
