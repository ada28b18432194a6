use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::SearchError;
use crate::models::{CandidateDocument, RankedResultSet, SearchQuery, SortMode, StrategyUsed};
use crate::search::aliases::AliasDictionary;
use crate::search::cache::{NoopCache, ResultCache, TtlCache};
use crate::search::chain;
use crate::search::corpus::FallbackCorpus;
use crate::search::filter::{apply_structured, PostFilter};
use crate::search::scoring::{rank, sort_by_mode};
use crate::search::taxonomy::Taxonomy;
use crate::store::{open_store, RecipeStore};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Per-attempt result limit for the retrieval chain.
    pub candidate_limit: usize,
    /// Cap on browse-all listings.
    pub browse_limit: usize,
    /// Zero disables caching.
    pub cache_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            candidate_limit: 100,
            browse_limit: 200,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

/// The search orchestrator.
///
/// ```text
/// cache ─hit─▶ return
///   │ miss
///   ▼
/// expand ─▶ retrieve (primary ▶ fuzzy ▶ substring) or browse
///   │            │ unavailable / nothing found
///   │            ▼
///   │        fallback corpus
///   ▼
/// structured filters ─▶ region/country/course ─▶ rank or sort ─▶ page ─▶ cache
/// ```
pub struct SearchPipeline {
    store: Arc<dyn RecipeStore>,
    aliases: Arc<AliasDictionary>,
    post_filter: PostFilter,
    corpus: Arc<FallbackCorpus>,
    cache: Arc<dyn ResultCache>,
    settings: PipelineSettings,
}

impl SearchPipeline {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        aliases: Arc<AliasDictionary>,
        taxonomy: Arc<Taxonomy>,
        corpus: Arc<FallbackCorpus>,
        cache: Arc<dyn ResultCache>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            aliases,
            post_filter: PostFilter::new(taxonomy),
            corpus,
            cache,
            settings,
        }
    }

    /// Load the dictionaries and corpus, open the store and build the cache
    /// described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let aliases = AliasDictionary::load(config.aliases_path.as_deref())?;
        let taxonomy = Taxonomy::load(config.taxonomy_path.as_deref())?;
        let corpus = FallbackCorpus::load(config.fallback_path.as_deref())?;
        tracing::info!(
            "Loaded {} alias groups, {} regions, {} fallback recipes",
            aliases.group_count(),
            taxonomy.regions.len(),
            corpus.len()
        );
        if corpus.is_empty() {
            tracing::warn!("Fallback corpus is empty; store outages will return no results");
        }

        let settings = PipelineSettings {
            candidate_limit: config.candidate_limit,
            browse_limit: config.browse_limit,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        };
        let cache: Arc<dyn ResultCache> = if settings.cache_ttl.is_zero() {
            Arc::new(NoopCache)
        } else {
            Arc::new(TtlCache::new())
        };

        Ok(Self::new(
            open_store(config),
            Arc::new(aliases),
            Arc::new(taxonomy),
            Arc::new(corpus),
            cache,
            settings,
        ))
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Run [`search`](Self::search) on its own task so a panic inside the
    /// pipeline becomes an internal error instead of a dropped connection.
    pub async fn run(self: Arc<Self>, query: SearchQuery) -> Result<RankedResultSet, SearchError> {
        tokio::spawn(async move { self.search(&query).await })
            .await
            .map_err(|e| SearchError::Internal(anyhow::anyhow!("search task failed: {e}")))?
    }

    #[tracing::instrument(
        skip(self, query),
        fields(q = query.free_text().unwrap_or("*"), strategy = tracing::field::Empty)
    )]
    pub async fn search(&self, query: &SearchQuery) -> Result<RankedResultSet, SearchError> {
        // ── Step 1: cache ──
        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("served from cache");
            return Ok(cached);
        }

        // ── Step 2: expand ──
        let text = query.free_text();
        let terms = text.map(|t| self.aliases.expand(t)).unwrap_or_default();

        // ── Step 3: retrieve ──
        let (candidates, strategy) = self.gather(&terms).await;
        tracing::Span::current().record("strategy", tracing::field::debug(strategy));

        // ── Step 4: filter ──
        let candidates = apply_structured(candidates, query);
        let candidates = self.post_filter.apply(
            candidates,
            query.region.as_deref(),
            query.country.as_deref(),
            query.course.as_deref(),
        );

        // ── Step 5: order ──
        let ordered = match (text, query.sort) {
            (Some(text), SortMode::Relevance) => {
                let limit = candidates.len();
                rank(candidates, text, limit)
            }
            (_, mode) => {
                let mut docs = candidates;
                sort_by_mode(&mut docs, mode);
                docs
            }
        };

        // ── Step 6: paginate ──
        let page = query.pagination;
        let total = ordered.len();
        let documents: Vec<CandidateDocument> = ordered
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();

        let result = RankedResultSet {
            documents,
            total,
            page: page.page,
            page_size: page.page_size,
            has_more: total > page.page.saturating_mul(page.page_size),
            strategy,
            expanded_terms: if terms.is_empty() { None } else { Some(terms) },
        };
        tracing::info!(total, returned = result.documents.len(), "search complete");

        self.cache.set(key, result.clone(), self.settings.cache_ttl);
        Ok(result)
    }

    /// Candidate pool for the expanded terms, or a browse listing when there
    /// are none. Falls back to the static corpus when the store is down or
    /// has nothing to offer.
    async fn gather(&self, terms: &[String]) -> (Vec<CandidateDocument>, StrategyUsed) {
        if terms.is_empty() {
            match self.store.browse(self.settings.browse_limit).await {
                Ok(docs) if !docs.is_empty() => return (docs, StrategyUsed::Browse),
                Ok(_) => tracing::info!("Browse returned nothing, serving fallback corpus"),
                Err(e) => tracing::warn!("Browse failed, serving fallback corpus: {e}"),
            }
            return self.fallback(self.settings.browse_limit);
        }

        match chain::retrieve(self.store.as_ref(), terms, self.settings.candidate_limit).await {
            Ok(found) if !found.documents.is_empty() => {
                let strategy = found.used();
                (found.documents, strategy)
            }
            Ok(_) => {
                tracing::info!("No strategy matched {terms:?}, serving fallback corpus");
                self.fallback(usize::MAX)
            }
            Err(e) => {
                tracing::warn!("Recipe store unavailable, serving fallback corpus: {e}");
                self.fallback(usize::MAX)
            }
        }
    }

    fn fallback(&self, limit: usize) -> (Vec<CandidateDocument>, StrategyUsed) {
        let docs = self.corpus.documents().iter().take(limit).cloned().collect();
        (docs, StrategyUsed::Mock)
    }
}
