use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health - `store` is the backend actually serving requests; it
/// reads `offline` when the configured backend could not be opened.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.pipeline.store_backend(),
        "configured_store": state.config.store.backend,
        "cache_ttl_secs": state.config.cache_ttl_secs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::search::pipeline::SearchPipeline;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_offline_when_configured_store_fails() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Rest;
        config.store.url = None;
        config.cache_ttl_secs = 0;
        let pipeline = SearchPipeline::from_config(&config).unwrap();
        let state = AppState::with_pipeline(config, Arc::new(pipeline));

        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "offline");
        assert_eq!(body["configured_store"], "rest");
        assert_eq!(body["cache_ttl_secs"], 0);
    }
}
