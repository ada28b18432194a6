use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, RegexQuery, TermQuery};
use tantivy::schema::*;
use tantivy::{doc, DocAddress, Index, IndexReader, IndexWriter, Order, ReloadPolicy, Searcher, Term};

use super::{RankedId, RecipeStore, StoreError};
use crate::models::CandidateDocument;
use crate::search::scoring::tokenize;
use crate::search::trigram::word_similarity;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Full-text recipe index built on tantivy.
///
/// Searchable fields are tokenized for BM25 and fuzzy term matching; a
/// lowercase raw copy of the title backs substring search, and the whole
/// document is stored as JSON for hydration.
pub struct RecipeIndex {
    index: Index,
    f_id: Field,
    f_title: Field,
    f_title_raw: Field,
    f_summary: Field,
    f_ingredients: Field,
    f_instructions: Field,
    f_created_ts: Field,
    f_payload: Field,
}

impl RecipeIndex {
    /// Create or open a recipe index at the given directory.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let mut schema_builder = Schema::builder();
        let f_id = schema_builder.add_text_field("id", STRING | STORED);
        let f_title = schema_builder.add_text_field("title", TEXT | STORED);
        let f_title_raw = schema_builder.add_text_field("title_raw", STRING);
        let f_summary = schema_builder.add_text_field("summary", TEXT);
        let f_ingredients = schema_builder.add_text_field("ingredients", TEXT);
        let f_instructions = schema_builder.add_text_field("instructions", TEXT);
        let f_created_ts = schema_builder.add_i64_field("created_ts", INDEXED | FAST);
        let f_payload = schema_builder.add_text_field("payload", STORED);
        let schema = schema_builder.build();

        let index = if index_dir.join("meta.json").exists() {
            Index::open_in_dir(index_dir).context("Failed to open existing tantivy index")?
        } else {
            Index::create_in_dir(index_dir, schema).context("Failed to create tantivy index")?
        };

        Ok(Self {
            index,
            f_id,
            f_title,
            f_title_raw,
            f_summary,
            f_ingredients,
            f_instructions,
            f_created_ts,
            f_payload,
        })
    }

    /// Add or replace documents, keyed by id.
    pub fn index_documents(&self, docs: &[CandidateDocument]) -> Result<()> {
        let mut writer: IndexWriter = self
            .index
            .writer(WRITER_HEAP_BYTES)
            .context("Failed to create index writer")?;

        for d in docs {
            writer.delete_term(Term::from_field_text(self.f_id, &d.id));
            let payload = serde_json::to_string(d).context("Failed to serialize recipe")?;
            writer.add_document(doc!(
                self.f_id => d.id.clone(),
                self.f_title => d.title.clone(),
                self.f_title_raw => d.title.to_lowercase(),
                self.f_summary => d.summary.clone().unwrap_or_default(),
                self.f_ingredients => d.ingredient_text(),
                self.f_instructions => d.recipe.instructions.join("\n"),
                self.f_created_ts => d.created_at.map(|t| t.timestamp()).unwrap_or(0),
                self.f_payload => payload,
            ))?;
        }

        writer.commit().context("Failed to commit index")?;
        Ok(())
    }

    pub fn doc_count(&self) -> Result<u64> {
        Ok(self.reader()?.searcher().num_docs())
    }

    fn reader(&self) -> Result<IndexReader> {
        self.index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .context("Failed to create reader")
    }

    /// BM25 over all text fields, title boosted.
    pub fn search_ranked(&self, query_str: &str, limit: usize) -> Result<Vec<RankedId>> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader()?.searcher();

        let mut query_parser = QueryParser::for_index(
            &self.index,
            vec![self.f_title, self.f_summary, self.f_ingredients, self.f_instructions],
        );
        query_parser.set_field_boost(self.f_title, 2.0);
        // Lenient parsing: stray quotes or operators in user input must not
        // turn into a failed attempt.
        let (query, errors) = query_parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!("Ignored {} query syntax errors in '{query_str}'", errors.len());
        }

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .context("Search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            if let Some(id) = self.stored_id(&searcher, address)? {
                hits.push(RankedId { id, rank: score });
            }
        }
        Ok(hits)
    }

    /// Levenshtein term matching on title and ingredients, ranked by trigram
    /// similarity of the query to the title.
    pub fn search_fuzzy(&self, query_str: &str, limit: usize) -> Result<Vec<RankedId>> {
        let tokens = tokenize(query_str);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader()?.searcher();

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for token in &tokens {
            let distance = edit_distance_for(token);
            for field in [self.f_title, self.f_ingredients] {
                let term = Term::from_field_text(field, token);
                clauses.push((Occur::Should, Box::new(FuzzyTermQuery::new(term, distance, true))));
            }
        }
        let query = BooleanQuery::new(clauses);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.saturating_mul(2).max(1)))
            .context("Fuzzy search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (_, address) in top_docs {
            if let Some(d) = self.stored_document(&searcher, address)? {
                let rank = word_similarity(query_str, &d.title);
                hits.push(RankedId { id: d.id, rank });
            }
        }
        hits.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Case-insensitive substring match against the title.
    pub fn search_title_contains(&self, needle: &str, limit: usize) -> Result<Vec<CandidateDocument>> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader()?.searcher();

        let pattern = format!(".*{}.*", escape_regex(&needle));
        let query = RegexQuery::from_pattern(&pattern, self.f_title_raw)
            .context("Failed to build substring query")?;
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .context("Substring search failed")?;

        self.collect_documents(&searcher, top_docs.into_iter().map(|(_, a)| a))
    }

    pub fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader()?.searcher();

        let clauses: Vec<(Occur, Box<dyn Query>)> = ids
            .iter()
            .map(|id| {
                let term = Term::from_field_text(self.f_id, id);
                let q: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Should, q)
            })
            .collect();
        let top_docs = searcher
            .search(&BooleanQuery::new(clauses), &TopDocs::with_limit(ids.len()))
            .context("Fetch by id failed")?;

        self.collect_documents(&searcher, top_docs.into_iter().map(|(_, a)| a))
    }

    /// Newest documents first.
    pub fn browse(&self, limit: usize) -> Result<Vec<CandidateDocument>> {
        let searcher = self.reader()?.searcher();
        let collector = TopDocs::with_limit(limit.max(1)).order_by_fast_field::<i64>("created_ts", Order::Desc);
        let top_docs = searcher.search(&AllQuery, &collector).context("Browse failed")?;
        self.collect_documents(&searcher, top_docs.into_iter().map(|(_, a)| a))
    }

    fn stored_id(&self, searcher: &Searcher, address: DocAddress) -> Result<Option<String>> {
        let doc: TantivyDocument = searcher
            .doc(address)
            .context("Failed to retrieve document")?;
        Ok(doc
            .get_first(self.f_id)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn stored_document(&self, searcher: &Searcher, address: DocAddress) -> Result<Option<CandidateDocument>> {
        let doc: TantivyDocument = searcher
            .doc(address)
            .context("Failed to retrieve document")?;
        let payload = doc
            .get_first(self.f_payload)
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        match serde_json::from_str::<CandidateDocument>(payload) {
            Ok(d) => Ok(Some(d)),
            Err(e) => {
                tracing::warn!("Skipping indexed recipe with unreadable payload: {e}");
                Ok(None)
            }
        }
    }

    fn collect_documents(
        &self,
        searcher: &Searcher,
        addresses: impl Iterator<Item = DocAddress>,
    ) -> Result<Vec<CandidateDocument>> {
        let mut docs = Vec::new();
        for address in addresses {
            if let Some(d) = self.stored_document(searcher, address)? {
                docs.push(d);
            }
        }
        Ok(docs)
    }
}

/// Tight tolerance for short tokens, where one edit already changes the word.
fn edit_distance_for(token: &str) -> u8 {
    match token.chars().count() {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Async [`RecipeStore`] over a [`RecipeIndex`]. Searches run on the
/// blocking thread pool.
#[derive(Clone)]
pub struct FtsRecipeStore {
    index: Arc<RecipeIndex>,
}

impl FtsRecipeStore {
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        Ok(Self {
            index: Arc::new(RecipeIndex::open_or_create(index_dir)?),
        })
    }

    pub fn index(&self) -> &RecipeIndex {
        &self.index
    }

    /// Index the recipes in `seed` when the index holds no documents yet.
    /// Returns how many were indexed.
    pub fn seed_if_empty(&self, seed: &Path) -> Result<usize> {
        if self.index.doc_count()? > 0 {
            return Ok(0);
        }
        let docs = super::memory::load_documents(seed)?;
        self.index.index_documents(&docs)?;
        Ok(docs.len())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&RecipeIndex) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let index = self.index.clone();
        tokio::task::spawn_blocking(move || f(&index))
            .await
            .map_err(|e| StoreError::Query(format!("search task failed: {e}")))?
            .map_err(|e| StoreError::Query(format!("{e:#}")))
    }
}

#[async_trait]
impl RecipeStore for FtsRecipeStore {
    fn backend(&self) -> &'static str {
        "fts"
    }

    async fn search_ranked(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        let query = query.to_string();
        self.blocking(move |index| index.search_ranked(&query, limit)).await
    }

    async fn search_fuzzy(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        let query = query.to_string();
        self.blocking(move |index| index.search_fuzzy(&query, limit)).await
    }

    async fn search_title_contains(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError> {
        let needle = needle.to_string();
        self.blocking(move |index| index.search_title_contains(&needle, limit)).await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError> {
        let ids = ids.to_vec();
        let docs = self.blocking(move |index| index.fetch_by_ids(&ids)).await?;
        // dedupe in case an id was indexed twice before a delete was committed
        let mut seen = HashSet::new();
        Ok(docs
            .into_iter()
            .filter(|d| seen.insert(d.id.clone()))
            .collect())
    }

    async fn browse(&self, limit: usize) -> Result<Vec<CandidateDocument>, StoreError> {
        self.blocking(move |index| index.browse(limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;
    use chrono::{TimeZone, Utc};

    fn recipe(id: &str, title: &str, ingredients: &[&str], year: i32) -> CandidateDocument {
        let mut d = CandidateDocument::new(id, title);
        d.recipe.ingredients = ingredients
            .iter()
            .map(|n| Ingredient {
                name: n.to_string(),
                quantity: None,
                unit: None,
            })
            .collect();
        d.created_at = Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
        d
    }

    fn sample_index() -> (tempfile::TempDir, RecipeIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = RecipeIndex::open_or_create(dir.path()).unwrap();
        index
            .index_documents(&[
                recipe("1", "Margherita Pizza", &["mozzarella", "basil", "tomato"], 2021),
                recipe("2", "Spaghetti Carbonara", &["guanciale", "egg", "pecorino"], 2023),
                recipe("3", "Chana Masala", &["chickpeas", "tomato", "garam masala"], 2022),
            ])
            .unwrap();
        (dir, index)
    }

    #[test]
    fn test_ranked_search_finds_title_match() {
        let (_dir, index) = sample_index();
        let hits = index.search_ranked("pizza", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert!(hits[0].rank > 0.0);
    }

    #[test]
    fn test_ranked_search_matches_any_term() {
        let (_dir, index) = sample_index();
        let hits = index.search_ranked("Tomato basil", 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_fuzzy_search_matches_typo() {
        let (_dir, index) = sample_index();
        assert!(index.search_ranked("carbonra", 10).unwrap().is_empty());
        let hits = index.search_fuzzy("carbonra", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }

    #[test]
    fn test_substring_search_on_title() {
        let (_dir, index) = sample_index();
        let docs = index.search_title_contains("GHETTI", 10).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Spaghetti Carbonara");
        assert_eq!(docs[0].recipe.ingredients.len(), 3);
    }

    #[test]
    fn test_fetch_by_ids_and_reindex_replaces() {
        let (_dir, index) = sample_index();
        index
            .index_documents(&[recipe("1", "Pizza Bianca", &["ricotta"], 2024)])
            .unwrap();
        assert_eq!(index.doc_count().unwrap(), 3);
        let docs = index.fetch_by_ids(&["1".to_string(), "3".to_string()]).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.title == "Pizza Bianca"));
    }

    #[test]
    fn test_browse_newest_first() {
        let (_dir, index) = sample_index();
        let docs = index.browse(2).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("mac & cheese"), "mac \\& cheese");
        assert_eq!(escape_regex("a.b*"), "a\\.b\\*");
    }

    #[tokio::test]
    async fn test_store_runs_searches_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = FtsRecipeStore::open_or_create(dir.path()).unwrap();
        store
            .index()
            .index_documents(&[recipe("7", "Mango Lassi", &["mango", "yogurt"], 2020)])
            .unwrap();
        let hits = store.search_ranked("lassi", 5).await.unwrap();
        assert_eq!(hits[0].id, "7");
        assert!(store.search_fuzzy("", 5).await.unwrap().is_empty());
    }
}
