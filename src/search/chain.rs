use std::collections::HashMap;
use thiserror::Error;

use crate::models::{CandidateDocument, StrategyUsed};
use crate::store::{RankedId, RecipeStore, StoreError};

/// Retrieval strategies, from most to least precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Server-side ranked full-text search.
    Primary,
    /// Similarity matching, tolerant of typos and inflection.
    Fuzzy,
    /// Case-insensitive "contains" on the title.
    Substring,
}

/// Order in which strategies are tried. Each strategy runs over every term
/// before the next one starts.
pub const STRATEGY_ORDER: [Strategy; 3] = [Strategy::Primary, Strategy::Fuzzy, Strategy::Substring];

impl From<Strategy> for StrategyUsed {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Primary => StrategyUsed::Primary,
            Strategy::Fuzzy => StrategyUsed::Fuzzy,
            Strategy::Substring => StrategyUsed::Substring,
        }
    }
}

#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreUnavailable(pub String);

/// Outcome of a single (strategy, term) attempt.
enum Attempt {
    Hit(Vec<CandidateDocument>),
    Miss,
}

#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub documents: Vec<CandidateDocument>,
    /// `None` when every attempt missed.
    pub strategy: Option<Strategy>,
    /// The term that produced the hit.
    pub matched_term: Option<String>,
}

impl Retrieval {
    pub fn used(&self) -> StrategyUsed {
        self.strategy.map(Into::into).unwrap_or(StrategyUsed::None)
    }
}

/// Run the strategy chain over `terms` and return the first non-empty
/// result.
///
/// A failed attempt counts as a miss. Only a store that cannot be reached
/// at all stops the chain early.
pub async fn retrieve(
    store: &dyn RecipeStore,
    terms: &[String],
    limit: usize,
) -> Result<Retrieval, StoreUnavailable> {
    for strategy in STRATEGY_ORDER {
        for term in terms {
            match attempt(store, strategy, term, limit).await {
                Ok(Attempt::Hit(documents)) => {
                    tracing::debug!(?strategy, term = %term, hits = documents.len(), "retrieval hit");
                    return Ok(Retrieval {
                        documents,
                        strategy: Some(strategy),
                        matched_term: Some(term.clone()),
                    });
                }
                Ok(Attempt::Miss) => {
                    tracing::debug!(?strategy, term = %term, "retrieval miss");
                }
                Err(StoreError::Unavailable(reason)) => return Err(StoreUnavailable(reason)),
                Err(e) => {
                    tracing::warn!(?strategy, term = %term, "{e}");
                }
            }
        }
    }
    Ok(Retrieval::default())
}

async fn attempt(
    store: &dyn RecipeStore,
    strategy: Strategy,
    term: &str,
    limit: usize,
) -> Result<Attempt, StoreError> {
    let documents = match strategy {
        Strategy::Primary => hydrate(store, store.search_ranked(term, limit).await?).await?,
        Strategy::Fuzzy => hydrate(store, store.search_fuzzy(term, limit).await?).await?,
        Strategy::Substring => store
            .search_title_contains(term, limit)
            .await?
            .into_iter()
            .map(|mut d| {
                d.rank = None;
                d
            })
            .collect(),
    };
    Ok(if documents.is_empty() {
        Attempt::Miss
    } else {
        Attempt::Hit(documents)
    })
}

/// Fetch the display projection for ranked ids, keeping the strategy's
/// order and attaching its score. Ids the store no longer has are dropped.
async fn hydrate(store: &dyn RecipeStore, hits: Vec<RankedId>) -> Result<Vec<CandidateDocument>, StoreError> {
    if hits.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
    let mut by_id: HashMap<String, CandidateDocument> = store
        .fetch_by_ids(&ids)
        .await?
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();

    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            by_id.remove(&hit.id).map(|mut d| {
                d.rank = Some(hit.rank);
                d
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRecipeStore;
    use crate::store::OfflineStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Scripted store: each (strategy, term) pair has a canned outcome, and
    /// every call is logged.
    #[derive(Default)]
    struct ScriptedStore {
        ranked: HashMap<String, Vec<RankedId>>,
        fuzzy: HashMap<String, Vec<RankedId>>,
        contains: HashMap<String, Vec<CandidateDocument>>,
        failing: Vec<String>,
        docs: Vec<CandidateDocument>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn log(&self, call: String) -> Result<(), StoreError> {
            let failing = self.failing.iter().any(|f| *f == call);
            self.calls.lock().push(call);
            if failing {
                Err(StoreError::Query("scripted failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RecipeStore for ScriptedStore {
        fn backend(&self) -> &'static str {
            "scripted"
        }

        async fn search_ranked(&self, query: &str, _limit: usize) -> Result<Vec<RankedId>, StoreError> {
            self.log(format!("ranked:{query}"))?;
            Ok(self.ranked.get(query).cloned().unwrap_or_default())
        }

        async fn search_fuzzy(&self, query: &str, _limit: usize) -> Result<Vec<RankedId>, StoreError> {
            self.log(format!("fuzzy:{query}"))?;
            Ok(self.fuzzy.get(query).cloned().unwrap_or_default())
        }

        async fn search_title_contains(
            &self,
            needle: &str,
            _limit: usize,
        ) -> Result<Vec<CandidateDocument>, StoreError> {
            self.log(format!("contains:{needle}"))?;
            Ok(self.contains.get(needle).cloned().unwrap_or_default())
        }

        async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError> {
            Ok(self.docs.iter().filter(|d| ids.contains(&d.id)).cloned().collect())
        }

        async fn browse(&self, _limit: usize) -> Result<Vec<CandidateDocument>, StoreError> {
            Ok(self.docs.clone())
        }
    }

    fn ranked(id: &str, rank: f32) -> RankedId {
        RankedId {
            id: id.to_string(),
            rank,
        }
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn docs() -> Vec<CandidateDocument> {
        vec![
            CandidateDocument::new("1", "Chicken Tikka"),
            CandidateDocument::new("2", "Pollo Asado"),
            CandidateDocument::new("3", "Murgh Makhani"),
        ]
    }

    #[tokio::test]
    async fn test_primary_hit_on_raw_term_stops_chain() {
        let mut store = ScriptedStore {
            docs: docs(),
            ..Default::default()
        };
        store.ranked.insert("chicken".into(), vec![ranked("1", 2.0)]);
        store.ranked.insert("pollo".into(), vec![ranked("2", 1.0)]);

        let r = retrieve(&store, &terms(&["chicken", "pollo"]), 10).await.unwrap();
        assert_eq!(r.strategy, Some(Strategy::Primary));
        assert_eq!(r.matched_term.as_deref(), Some("chicken"));
        assert_eq!(r.documents.len(), 1);
        assert_eq!(r.documents[0].rank, Some(2.0));
        assert_eq!(*store.calls.lock(), vec!["ranked:chicken"]);
    }

    #[tokio::test]
    async fn test_alias_term_wins_under_primary_before_fuzzy() {
        let mut store = ScriptedStore {
            docs: docs(),
            ..Default::default()
        };
        store.ranked.insert("pollo".into(), vec![ranked("2", 1.0)]);
        store.fuzzy.insert("chicken".into(), vec![ranked("1", 0.9)]);

        let r = retrieve(&store, &terms(&["chicken", "pollo"]), 10).await.unwrap();
        assert_eq!(r.strategy, Some(Strategy::Primary));
        assert_eq!(r.documents[0].id, "2");
        assert_eq!(*store.calls.lock(), vec!["ranked:chicken", "ranked:pollo"]);
    }

    #[tokio::test]
    async fn test_falls_through_to_substring_with_null_rank() {
        let mut store = ScriptedStore {
            docs: docs(),
            ..Default::default()
        };
        let mut hit = CandidateDocument::new("3", "Murgh Makhani");
        hit.rank = Some(7.0);
        store.contains.insert("murgh".into(), vec![hit]);

        let r = retrieve(&store, &terms(&["murgh"]), 10).await.unwrap();
        assert_eq!(r.used(), StrategyUsed::Substring);
        assert_eq!(r.documents[0].rank, None);
        assert_eq!(
            *store.calls.lock(),
            vec!["ranked:murgh", "fuzzy:murgh", "contains:murgh"]
        );
    }

    #[tokio::test]
    async fn test_failed_attempt_is_a_miss() {
        let mut store = ScriptedStore {
            docs: docs(),
            failing: vec!["ranked:chicken".to_string()],
            ..Default::default()
        };
        store.fuzzy.insert("chicken".into(), vec![ranked("1", 0.5)]);

        let r = retrieve(&store, &terms(&["chicken"]), 10).await.unwrap();
        assert_eq!(r.strategy, Some(Strategy::Fuzzy));
        assert_eq!(r.documents[0].rank, Some(0.5));
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_none() {
        let store = ScriptedStore::default();
        let r = retrieve(&store, &terms(&["a", "b"]), 10).await.unwrap();
        assert!(r.documents.is_empty());
        assert_eq!(r.used(), StrategyUsed::None);
        assert_eq!(store.calls.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_hydration_keeps_strategy_order_and_drops_unknown_ids() {
        let mut store = ScriptedStore {
            docs: docs(),
            ..Default::default()
        };
        store.ranked.insert(
            "x".into(),
            vec![ranked("3", 3.0), ranked("missing", 2.5), ranked("1", 2.0)],
        );
        let r = retrieve(&store, &terms(&["x"]), 10).await.unwrap();
        let ids: Vec<&str> = r.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts() {
        let store = OfflineStore::new("down");
        let err = retrieve(&store, &terms(&["pizza"]), 10).await.unwrap_err();
        assert_eq!(err.0, "down");
    }

    #[tokio::test]
    async fn test_empty_terms_returns_none_without_calls() {
        let store = MemoryRecipeStore::new(docs());
        let r = retrieve(&store, &[], 10).await.unwrap();
        assert_eq!(r.used(), StrategyUsed::None);
    }
}
