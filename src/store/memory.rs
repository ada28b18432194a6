use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

use super::{RankedId, RecipeStore, StoreError};
use crate::models::CandidateDocument;
use crate::search::scoring::tokenize;
use crate::search::trigram::{word_similarity, SIMILARITY_THRESHOLD};

/// Store over an in-process document list.
pub struct MemoryRecipeStore {
    documents: Vec<CandidateDocument>,
}

impl MemoryRecipeStore {
    pub fn new(documents: Vec<CandidateDocument>) -> Self {
        Self { documents }
    }
}

/// Read a JSON array of store rows, skipping rows that cannot be coerced.
pub fn load_documents(path: &Path) -> Result<Vec<CandidateDocument>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recipes from {}", path.display()))?;
    parse_documents(&data).with_context(|| format!("Failed to parse recipes in {}", path.display()))
}

pub fn parse_documents(data: &str) -> Result<Vec<CandidateDocument>> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(data)?;
    let total = rows.len();
    let docs: Vec<CandidateDocument> = rows.iter().filter_map(CandidateDocument::from_row).collect();
    if docs.len() < total {
        tracing::warn!("Skipped {} malformed recipe rows", total - docs.len());
    }
    Ok(docs)
}

fn ranked_by<F>(docs: &[CandidateDocument], limit: usize, score: F) -> Vec<RankedId>
where
    F: Fn(&CandidateDocument) -> f32,
{
    let mut hits: Vec<RankedId> = docs
        .iter()
        .map(|d| RankedId {
            id: d.id.clone(),
            rank: score(d),
        })
        .filter(|h| h.rank > 0.0)
        .collect();
    hits.sort_by(|a, b| b.rank.total_cmp(&a.rank));
    hits.truncate(limit);
    hits
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn search_ranked(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        let tokens: HashSet<String> = tokenize(query).into_iter().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ranked_by(&self.documents, limit, |d| {
            let count = |text: &str| tokenize(text).iter().filter(|t| tokens.contains(*t)).count() as f32;
            2.0 * count(&d.title)
                + count(d.summary.as_deref().unwrap_or(""))
                + count(&d.ingredient_text())
        }))
    }

    async fn search_fuzzy(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        Ok(ranked_by(&self.documents, limit, |d| {
            let similarity = word_similarity(query, &d.title);
            if similarity >= SIMILARITY_THRESHOLD {
                similarity
            } else {
                0.0
            }
        }))
    }

    async fn search_title_contains(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .documents
            .iter()
            .filter(|d| d.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .documents
            .iter()
            .filter(|d| wanted.contains(d.id.as_str()))
            .cloned()
            .collect())
    }

    async fn browse(&self, limit: usize) -> Result<Vec<CandidateDocument>, StoreError> {
        let mut docs = self.documents.clone();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(limit);
        Ok(docs)
    }
}
