use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SearchError;
use crate::models::{
    split_tags, ContentType, HierarchyFilter, Pagination, RecipeListResponse, SearchQuery,
    SearchResponse, SortMode,
};
use crate::state::AppState;

const DBFTS_PAGE_SIZE: usize = 10;
const DBFTS_MAX_PAGE_SIZE: usize = 50;
const RECIPES_PER_PAGE: usize = 12;
const RECIPES_MAX_PER_PAGE: usize = 48;

/// POST /api/search/dbfts - Free-text search:
///   1. Validate the body (`q` is required and must be a string)
///   2. Expand aliases, run the primary → fuzzy → substring chain
///   3. Narrow by region / country / course, re-rank, paginate
///
/// A degraded answer (fuzzy, substring or the fallback corpus) is still a
/// 200; the `fallback` field says which path produced it.
pub async fn search_dbfts(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, SearchError> {
    // ── Step 1: Validate ─────────────────────────────────────
    let Json(body) = body.map_err(|e| SearchError::invalid(e.body_text()))?;
    let query = parse_dbfts_request(&body)?;

    // ── Step 2-3: Pipeline ───────────────────────────────────
    let result = state.pipeline.clone().run(query).await?;
    Ok(Json(result.into()))
}

/// Turn a loosely-typed JSON body into a [`SearchQuery`]. Numeric fields may
/// be numbers or numeric strings; anything unusable takes the default.
pub fn parse_dbfts_request(body: &Value) -> Result<SearchQuery, SearchError> {
    let obj = body
        .as_object()
        .ok_or_else(|| SearchError::invalid("Request body must be a JSON object"))?;

    let text = match obj.get("q") {
        Some(Value::String(q)) => q.as_str(),
        Some(_) => return Err(SearchError::invalid("q must be a string")),
        None => return Err(SearchError::invalid("q is required")),
    };

    let pagination = Pagination::coerce(
        obj.get("page").and_then(positive_int),
        obj.get("pageSize").and_then(positive_int),
        DBFTS_PAGE_SIZE,
        DBFTS_MAX_PAGE_SIZE,
    );

    let mut query = SearchQuery::new(Some(text), pagination);
    query.region = obj.get("region").and_then(non_blank);
    query.country = obj.get("country").and_then(non_blank);
    query.course = obj.get("course").and_then(non_blank);
    Ok(query)
}

fn positive_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Query string of `GET /api/search/recipes`. Everything arrives as text and
/// is interpreted leniently.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeSearchParams {
    pub q: Option<String>,
    /// Older clients send the region as `approach`.
    pub approach: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub course: Option<String>,
    /// Comma separated; every tag must match.
    pub diet_tags: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub sort: Option<String>,
    pub cuisine_id: Option<String>,
    pub food_style_id: Option<String>,
    pub cookbook_id: Option<String>,
    pub chapter_id: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl RecipeSearchParams {
    pub fn into_query(self) -> SearchQuery {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        fn number(value: &Option<String>) -> Option<u64> {
            value.as_deref().and_then(|v| v.trim().parse().ok())
        }

        let pagination = Pagination::coerce(
            number(&self.page),
            number(&self.per_page),
            RECIPES_PER_PAGE,
            RECIPES_MAX_PER_PAGE,
        );

        let mut query = SearchQuery::new(self.q.as_deref(), pagination);
        query.region = clean(self.region).or_else(|| clean(self.approach));
        query.country = clean(self.country);
        query.course = clean(self.course);
        query.diet_tags = self.diet_tags.as_deref().map(split_tags).unwrap_or_default();
        query.content_type = Some(
            self.content_type
                .as_deref()
                .and_then(ContentType::parse)
                .unwrap_or_default(),
        );
        query.sort = self
            .sort
            .as_deref()
            .and_then(SortMode::parse)
            .unwrap_or_default();
        query.hierarchy = HierarchyFilter {
            cuisine_id: clean(self.cuisine_id),
            food_style_id: clean(self.food_style_id),
            cookbook_id: clean(self.cookbook_id),
            chapter_id: clean(self.chapter_id),
        };
        query
    }
}

/// GET /api/search/recipes - Structured catalog search. `q` is optional;
/// without it the catalog is browsed and filtered.
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipeSearchParams>,
) -> Result<Json<RecipeListResponse>, SearchError> {
    let result = state.pipeline.clone().run(params.into_query()).await?;
    Ok(Json(result.into()))
}
