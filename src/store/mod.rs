//! Recipe store backends.
//!
//! The search pipeline only reads from the store, through [`RecipeStore`]:
//! ranked full-text search, fuzzy similarity search, title substring search,
//! bulk fetch-by-id and an unranked browse listing.

pub mod fts;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, StoreBackend};
use crate::models::CandidateDocument;

/// A document id with the score the producing strategy gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedId {
    pub id: String,
    pub rank: f32,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached at all. The pipeline answers from the
    /// fallback corpus instead.
    #[error("recipe store unavailable: {0}")]
    Unavailable(String),

    /// A single call failed; the caller moves on to its next attempt.
    #[error("store query failed: {0}")]
    Query(String),

    #[error("malformed store response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    /// Tokenized, relevance-ranked full-text search.
    async fn search_ranked(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError>;

    /// Typo-tolerant similarity search.
    async fn search_fuzzy(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError>;

    /// Case-insensitive "contains" match on the title.
    async fn search_title_contains(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError>;

    /// Display projection for the given ids, in any order.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError>;

    /// Recent documents, unranked.
    async fn browse(&self, limit: usize) -> Result<Vec<CandidateDocument>, StoreError>;
}

/// Stand-in used when the configured backend could not be opened. Every
/// call reports the store as unavailable.
pub struct OfflineStore {
    reason: String,
}

impl OfflineStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl RecipeStore for OfflineStore {
    fn backend(&self) -> &'static str {
        "offline"
    }

    async fn search_ranked(&self, _query: &str, _limit: usize) -> Result<Vec<RankedId>, StoreError> {
        self.unavailable()
    }

    async fn search_fuzzy(&self, _query: &str, _limit: usize) -> Result<Vec<RankedId>, StoreError> {
        self.unavailable()
    }

    async fn search_title_contains(
        &self,
        _needle: &str,
        _limit: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError> {
        self.unavailable()
    }

    async fn fetch_by_ids(&self, _ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError> {
        self.unavailable()
    }

    async fn browse(&self, _limit: usize) -> Result<Vec<CandidateDocument>, StoreError> {
        self.unavailable()
    }
}

/// Open the configured backend. A backend that fails to open is replaced
/// by an [`OfflineStore`] so the service still answers from the fallback
/// corpus.
pub fn open_store(config: &Config) -> Arc<dyn RecipeStore> {
    match try_open_store(config) {
        Ok(store) => {
            tracing::info!("Recipe store backend: {}", store.backend());
            store
        }
        Err(e) => {
            tracing::error!("Failed to open recipe store, serving fallback corpus only: {e:#}");
            Arc::new(OfflineStore::new(format!("{e:#}")))
        }
    }
}

fn try_open_store(config: &Config) -> anyhow::Result<Arc<dyn RecipeStore>> {
    Ok(match config.store.backend {
        StoreBackend::Fts => {
            let store = fts::FtsRecipeStore::open_or_create(&config.index_dir())?;
            if let Some(seed) = &config.seed_path {
                let indexed = store.seed_if_empty(seed)?;
                if indexed > 0 {
                    tracing::info!("Seeded search index with {indexed} recipes from {}", seed.display());
                }
            }
            Arc::new(store)
        }
        StoreBackend::Rest => {
            let base_url = config
                .store
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("RECIPE_STORE_URL is required for the rest backend"))?;
            Arc::new(rest::RestRecipeStore::new(
                &base_url,
                config.store.api_key.clone(),
                Duration::from_secs(config.store.timeout_secs),
            )?)
        }
        StoreBackend::Memory => {
            let documents = match &config.seed_path {
                Some(seed) => memory::load_documents(seed)?,
                None => Vec::new(),
            };
            Arc::new(memory::MemoryRecipeStore::new(documents))
        }
    })
}
