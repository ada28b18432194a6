use std::sync::Arc;

use crate::config::Config;
use crate::search::pipeline::SearchPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<SearchPipeline>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // Ensure data directories exist
        std::fs::create_dir_all(config.index_dir())?;

        let pipeline = SearchPipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    /// State around an already-built pipeline, e.g. one with a substitute
    /// store or cache.
    pub fn with_pipeline(config: Config, pipeline: Arc<SearchPipeline>) -> Self {
        Self { config, pipeline }
    }
}
