use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{RankedId, RecipeStore, StoreError};
use crate::models::CandidateDocument;

/// Columns requested for the display projection.
const PROJECTION: &str = "id,title,summary,recipe,hero_image_url,content_type,diet_tags,cuisine_id,food_style_id,cookbook_id,chapter_id,trending_score,created_at";

/// Recipe store behind a PostgREST-compatible HTTP API: ranked and fuzzy
/// search are remote procedures, substring and id lookups are table filters.
pub struct RestRecipeStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SearchRpcRequest<'a> {
    search_query: &'a str,
    match_limit: usize,
}

impl RestRecipeStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for recipe store")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.base_url)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/recipes", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let request = match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}")),
            None => request,
        };

        let resp = request.send().await.map_err(classify)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("store returned {status}: {body}")));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn rpc(&self, function: &str, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        let body = SearchRpcRequest {
            search_query: query,
            match_limit: limit,
        };
        let value = self
            .send(self.client.post(self.rpc_url(function)).json(&body))
            .await?;
        parse_ranked_rows(&value)
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<CandidateDocument>, StoreError> {
        let mut params: Vec<(&str, String)> = vec![("select", PROJECTION.to_string())];
        params.extend(filters.iter().cloned());
        let value = self.send(self.client.get(self.table_url()).query(&params)).await?;
        parse_document_rows(&value)
    }
}

/// Connection failures mean the store is down; anything else (including
/// timeouts) only fails the current attempt.
fn classify(e: reqwest::Error) -> StoreError {
    if e.is_connect() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Query(e.to_string())
    }
}

/// `[{id, rank}]` rows; the score column may be called `rank` or
/// `similarity`, and ids may be numbers.
fn parse_ranked_rows(value: &Value) -> Result<Vec<RankedId>, StoreError> {
    let rows = value
        .as_array()
        .ok_or_else(|| StoreError::Decode("expected an array of ranked rows".to_string()))?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let id = match row.get("id")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let rank = row
                .get("rank")
                .or_else(|| row.get("similarity"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as f32;
            Some(RankedId { id, rank })
        })
        .collect())
}

fn parse_document_rows(value: &Value) -> Result<Vec<CandidateDocument>, StoreError> {
    let rows = value
        .as_array()
        .ok_or_else(|| StoreError::Decode("expected an array of recipe rows".to_string()))?;
    let docs: Vec<CandidateDocument> = rows.iter().filter_map(CandidateDocument::from_row).collect();
    if docs.len() < rows.len() {
        tracing::warn!("Dropped {} recipe rows without id or title", rows.len() - docs.len());
    }
    Ok(docs)
}

/// PostgREST `ilike` filter matching `needle` as a literal substring.
///
/// `%`, `_` and `\` are escaped for LIKE. `*` is PostgREST's wildcard and
/// has no literal form, so it is dropped. Values holding reserved
/// characters are double-quoted. `None` when nothing searchable is left.
fn ilike_pattern(needle: &str) -> Option<String> {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        match c {
            '*' => {}
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    let escaped = escaped.trim();
    if escaped.is_empty() {
        return None;
    }

    let value = format!("*{escaped}*");
    if value.contains(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\')) {
        let quoted = value.replace('\\', "\\\\").replace('"', "\\\"");
        Some(format!("ilike.\"{quoted}\""))
    } else {
        Some(format!("ilike.{value}"))
    }
}

fn in_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl RecipeStore for RestRecipeStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn search_ranked(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        self.rpc("search_recipes_ranked", query, limit).await
    }

    async fn search_fuzzy(&self, query: &str, limit: usize) -> Result<Vec<RankedId>, StoreError> {
        self.rpc("search_recipes_fuzzy", query, limit).await
    }

    async fn search_title_contains(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError> {
        let Some(pattern) = ilike_pattern(needle) else {
            return Ok(Vec::new());
        };
        self.select(&[("title", pattern), ("limit", limit.to_string())])
            .await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateDocument>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(&[("id", in_list(ids))]).await
    }

    async fn browse(&self, limit: usize) -> Result<Vec<CandidateDocument>, StoreError> {
        self.select(&[
            ("order", "created_at.desc.nullslast".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }
}
