use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of content a catalog entry represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Recipe,
    Short,
    Video,
    Image,
}

impl ContentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "recipe" => Some(Self::Recipe),
            "short" => Some(Self::Short),
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Relevance,
    Trending,
    Newest,
}

impl SortMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "relevance" => Some(Self::Relevance),
            "trending" => Some(Self::Trending),
            "newest" => Some(Self::Newest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Structured recipe body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeBody {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Denormalized projection of a recipe or post, as returned by every
/// retrieval strategy and by the fallback corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub recipe: RecipeBody,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    /// Score attached by the strategy that produced this document.
    /// Substring matches carry no score.
    #[serde(default)]
    pub rank: Option<f32>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub diet_tags: Vec<String>,
    #[serde(default)]
    pub cuisine_id: Option<String>,
    #[serde(default)]
    pub food_style_id: Option<String>,
    #[serde(default)]
    pub cookbook_id: Option<String>,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub trending_score: f32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CandidateDocument {
    /// Minimal document, mostly useful for seeding and tests.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: None,
            recipe: RecipeBody::default(),
            hero_image_url: None,
            rank: None,
            content_type: ContentType::Recipe,
            diet_tags: Vec::new(),
            cuisine_id: None,
            food_style_id: None,
            cookbook_id: None,
            chapter_id: None,
            trending_score: 0.0,
            created_at: None,
        }
    }

    /// Coerce a loosely-typed store row into a document.
    ///
    /// Rows come from several shapes: numeric or string ids, a `recipe`
    /// column that is either an object or a JSON-encoded string, ingredient
    /// lists of plain strings or objects, and instructions as one block of
    /// text or a list of steps. Returns `None` when the row has no usable id
    /// or title.
    pub fn from_row(row: &Value) -> Option<Self> {
        let obj = row.as_object()?;
        let id = obj.get("id").and_then(coerce_id)?;
        let title = obj
            .get("title")
            .or_else(|| obj.get("name"))
            .and_then(non_empty_string)?;

        let recipe = obj
            .get("recipe")
            .map(coerce_recipe)
            .unwrap_or_default();

        let created_at = obj
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        let trending_score = ["trending_score", "likes", "votes"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_f64))
            .unwrap_or(0.0) as f32;

        let content_type = obj
            .get("content_type")
            .or_else(|| obj.get("type"))
            .and_then(Value::as_str)
            .and_then(ContentType::parse)
            .unwrap_or_default();

        Some(Self {
            id,
            title,
            summary: obj
                .get("summary")
                .or_else(|| obj.get("description"))
                .and_then(non_empty_string),
            recipe,
            hero_image_url: ["hero_image_url", "image_url", "hero_image"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(non_empty_string)),
            rank: obj.get("rank").and_then(Value::as_f64).map(|r| r as f32),
            content_type,
            diet_tags: obj.get("diet_tags").map(coerce_tags).unwrap_or_default(),
            cuisine_id: obj.get("cuisine_id").and_then(coerce_id),
            food_style_id: obj.get("food_style_id").and_then(coerce_id),
            cookbook_id: obj.get("cookbook_id").and_then(coerce_id),
            chapter_id: obj.get("chapter_id").and_then(coerce_id),
            trending_score,
            created_at,
        })
    }

    /// Lowercased title, summary and ingredient names, used for keyword
    /// narrowing.
    pub fn searchable_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        if let Some(summary) = &self.summary {
            text.push(' ');
            text.push_str(&summary.to_lowercase());
        }
        for ingredient in &self.recipe.ingredients {
            text.push(' ');
            text.push_str(&ingredient.name.to_lowercase());
        }
        text
    }

    pub fn ingredient_text(&self) -> String {
        self.recipe
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn coerce_recipe(value: &Value) -> RecipeBody {
    match value {
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .map(|parsed| coerce_recipe(&parsed))
            .unwrap_or_default(),
        Value::Object(obj) => RecipeBody {
            ingredients: obj
                .get("ingredients")
                .map(coerce_ingredients)
                .unwrap_or_default(),
            instructions: obj
                .get("instructions")
                .or_else(|| obj.get("steps"))
                .map(coerce_instructions)
                .unwrap_or_default(),
        },
        _ => RecipeBody::default(),
    }
}

fn coerce_ingredients(value: &Value) -> Vec<Ingredient> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) if !name.trim().is_empty() => Some(Ingredient {
                name: name.trim().to_string(),
                quantity: None,
                unit: None,
            }),
            Value::Object(obj) => {
                let name = ["name", "ingredient", "item"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(non_empty_string))?;
                let quantity = obj.get("quantity").or_else(|| obj.get("amount")).and_then(|q| {
                    match q {
                        Value::Number(n) => Some(n.to_string()),
                        other => non_empty_string(other),
                    }
                });
                Some(Ingredient {
                    name,
                    quantity,
                    unit: obj.get("unit").and_then(non_empty_string),
                })
            }
            _ => None,
        })
        .collect()
}

fn coerce_instructions(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(steps) => steps
            .iter()
            .filter_map(|step| match step {
                Value::Object(obj) => ["text", "step", "instruction"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(non_empty_string)),
                other => non_empty_string(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_tags(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => split_tags(s),
        Value::Array(items) => items
            .iter()
            .filter_map(non_empty_string)
            .map(|t| t.to_lowercase())
            .collect(),
        _ => Vec::new(),
    }
}

/// Split a comma separated tag list into lowercase tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Exact-match catalog hierarchy filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyFilter {
    pub cuisine_id: Option<String>,
    pub food_style_id: Option<String>,
    pub cookbook_id: Option<String>,
    pub chapter_id: Option<String>,
}

impl HierarchyFilter {
    pub fn is_empty(&self) -> bool {
        self.cuisine_id.is_none()
            && self.food_style_id.is_none()
            && self.cookbook_id.is_none()
            && self.chapter_id.is_none()
    }
}

/// Page window, always positive and bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Coerce raw values into a valid window. Missing or non-positive values
    /// take the defaults; the page size is capped at `max_size`.
    pub fn coerce(page: Option<u64>, page_size: Option<u64>, default_size: usize, max_size: usize) -> Self {
        let page = page.filter(|p| *p > 0).map(|p| p as usize).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .map(|s| s as usize)
            .unwrap_or(default_size)
            .min(max_size)
            .max(1);
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// An immutable search request after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub pagination: Pagination,
    pub region: Option<String>,
    pub country: Option<String>,
    pub course: Option<String>,
    pub diet_tags: Vec<String>,
    pub content_type: Option<ContentType>,
    pub sort: SortMode,
    pub hierarchy: HierarchyFilter,
}

impl SearchQuery {
    pub fn new(text: Option<&str>, pagination: Pagination) -> Self {
        Self {
            text: text.map(str::to_string),
            pagination,
            region: None,
            country: None,
            course: None,
            diet_tags: Vec::new(),
            content_type: None,
            sort: SortMode::Relevance,
            hierarchy: HierarchyFilter::default(),
        }
    }

    /// Trimmed free text, or `None` for blank and `*` (browse-all).
    pub fn free_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "*")
    }

    /// Deterministic signature of everything that affects the result.
    pub fn cache_key(&self) -> String {
        fn part(value: &Option<String>) -> String {
            value.as_deref().unwrap_or("").trim().to_lowercase()
        }
        let content_type = self
            .content_type
            .map(|c| format!("{c:?}").to_lowercase())
            .unwrap_or_default();
        [
            self.free_text().unwrap_or("").to_lowercase(),
            part(&self.region),
            part(&self.country),
            part(&self.course),
            self.pagination.page.to_string(),
            self.pagination.page_size.to_string(),
            self.diet_tags.join(","),
            content_type,
            format!("{:?}", self.sort).to_lowercase(),
            part(&self.hierarchy.cuisine_id),
            part(&self.hierarchy.food_style_id),
            part(&self.hierarchy.cookbook_id),
            part(&self.hierarchy.chapter_id),
        ]
        .join("|")
    }
}

/// Which path produced the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyUsed {
    Primary,
    Fuzzy,
    Substring,
    None,
    Browse,
    Mock,
}

impl StrategyUsed {
    /// Degradation marker exposed to clients; `None` when the best strategy
    /// (or plain browsing) answered.
    pub fn fallback_label(&self) -> Option<&'static str> {
        match self {
            StrategyUsed::Fuzzy => Some("fuzzy"),
            StrategyUsed::Substring => Some("substring"),
            StrategyUsed::Mock => Some("mock"),
            StrategyUsed::Primary | StrategyUsed::Browse | StrategyUsed::None => None,
        }
    }
}

/// Final, paginated pipeline output. This is what the cache stores.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResultSet {
    pub documents: Vec<CandidateDocument>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub strategy: StrategyUsed,
    pub expanded_terms: Option<Vec<String>>,
}

impl RankedResultSet {
    pub fn fallback(&self) -> Option<String> {
        self.strategy.fallback_label().map(str::to_string)
    }
}

/// Response of `POST /api/search/dbfts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<CandidateDocument>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub fallback: Option<String>,
    pub expanded_terms: Option<Vec<String>>,
    pub strategy: StrategyUsed,
}

impl From<RankedResultSet> for SearchResponse {
    fn from(set: RankedResultSet) -> Self {
        let fallback = set.fallback();
        Self {
            results: set.documents,
            total: set.total,
            page: set.page,
            page_size: set.page_size,
            has_more: set.has_more,
            fallback,
            expanded_terms: set.expanded_terms,
            strategy: set.strategy,
        }
    }
}

/// Response of `GET /api/search/recipes`.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<CandidateDocument>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub has_more: bool,
    pub fallback: Option<String>,
    pub expanded_terms: Option<Vec<String>>,
    pub strategy: StrategyUsed,
}

impl From<RankedResultSet> for RecipeListResponse {
    fn from(set: RankedResultSet) -> Self {
        let fallback = set.fallback();
        Self {
            recipes: set.documents,
            total: set.total,
            page: set.page,
            per_page: set.page_size,
            has_more: set.has_more,
            fallback,
            expanded_terms: set.expanded_terms,
            strategy: set.strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_row_coerces_numeric_id_and_string_recipe() {
        let row = json!({
            "id": 42,
            "title": "  Masala Dosa ",
            "recipe": "{\"ingredients\": [\"rice\", {\"name\": \"urad dal\", \"quantity\": 1, \"unit\": \"cup\"}], \"instructions\": \"Soak.\\nGrind.\\n\\nFry.\"}",
            "created_at": "2024-03-01T10:00:00Z",
            "likes": 17
        });
        let doc = CandidateDocument::from_row(&row).unwrap();
        assert_eq!(doc.id, "42");
        assert_eq!(doc.title, "Masala Dosa");
        assert_eq!(doc.recipe.ingredients.len(), 2);
        assert_eq!(doc.recipe.ingredients[1].quantity.as_deref(), Some("1"));
        assert_eq!(doc.recipe.instructions, vec!["Soak.", "Grind.", "Fry."]);
        assert_eq!(doc.trending_score, 17.0);
        assert!(doc.created_at.is_some());
        assert_eq!(doc.content_type, ContentType::Recipe);
    }

    #[test]
    fn test_from_row_rejects_missing_title_or_id() {
        assert!(CandidateDocument::from_row(&json!({"id": 1})).is_none());
        assert!(CandidateDocument::from_row(&json!({"title": "Soup"})).is_none());
        assert!(CandidateDocument::from_row(&json!({"id": 1, "title": "   "})).is_none());
        assert!(CandidateDocument::from_row(&json!("not an object")).is_none());
    }

    #[test]
    fn test_from_row_instruction_objects_and_tag_string() {
        let row = json!({
            "id": "a1",
            "title": "Green Salad",
            "recipe": {"steps": [{"text": "Wash"}, "Toss"]},
            "diet_tags": "Vegan, gluten-free",
            "type": "video"
        });
        let doc = CandidateDocument::from_row(&row).unwrap();
        assert_eq!(doc.recipe.instructions, vec!["Wash", "Toss"]);
        assert_eq!(doc.diet_tags, vec!["vegan", "gluten-free"]);
        assert_eq!(doc.content_type, ContentType::Video);
    }

    #[test]
    fn test_searchable_text_includes_ingredients() {
        let mut doc = CandidateDocument::new("1", "Dal Tadka");
        doc.summary = Some("Comforting LENTILS".to_string());
        doc.recipe.ingredients.push(Ingredient {
            name: "Cumin".to_string(),
            quantity: None,
            unit: None,
        });
        assert_eq!(doc.searchable_text(), "dal tadka comforting lentils cumin");
    }

    #[test]
    fn test_pagination_coercion() {
        let p = Pagination::coerce(None, None, 10, 50);
        assert_eq!((p.page, p.page_size), (1, 10));
        let p = Pagination::coerce(Some(0), Some(0), 10, 50);
        assert_eq!((p.page, p.page_size), (1, 10));
        let p = Pagination::coerce(Some(3), Some(500), 12, 48);
        assert_eq!((p.page, p.page_size), (3, 48));
        assert_eq!(p.offset(), 96);
    }

    #[test]
    fn test_free_text_treats_star_and_blank_as_browse() {
        let page = Pagination::coerce(None, None, 10, 50);
        assert_eq!(SearchQuery::new(Some("*"), page).free_text(), None);
        assert_eq!(SearchQuery::new(Some("   "), page).free_text(), None);
        assert_eq!(SearchQuery::new(None, page).free_text(), None);
        assert_eq!(SearchQuery::new(Some(" Pizza "), page).free_text(), Some("Pizza"));
    }

    #[test]
    fn test_cache_key_normalizes_text_and_separates_pages() {
        let mut a = SearchQuery::new(Some("Pizza "), Pagination::coerce(Some(1), Some(10), 10, 50));
        let b = SearchQuery::new(Some("pizza"), Pagination::coerce(Some(1), Some(10), 10, 50));
        assert_eq!(a.cache_key(), b.cache_key());
        a.pagination.page = 2;
        assert_ne!(a.cache_key(), b.cache_key());
        let mut c = b.clone();
        c.region = Some("south-asia".to_string());
        assert_ne!(c.cache_key(), b.cache_key());
    }

    #[test]
    fn test_fallback_label() {
        assert_eq!(StrategyUsed::Primary.fallback_label(), None);
        assert_eq!(StrategyUsed::Browse.fallback_label(), None);
        assert_eq!(StrategyUsed::Mock.fallback_label(), Some("mock"));
        assert_eq!(StrategyUsed::Fuzzy.fallback_label(), Some("fuzzy"));
    }

    #[test]
    fn test_search_response_serializes_camel_case() {
        let set = RankedResultSet {
            documents: vec![],
            total: 0,
            page: 1,
            page_size: 10,
            has_more: false,
            strategy: StrategyUsed::Mock,
            expanded_terms: None,
        };
        let json = serde_json::to_value(SearchResponse::from(set.clone())).unwrap();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["hasMore"], false);
        assert_eq!(json["fallback"], "mock");
        assert!(json["expandedTerms"].is_null());

        let json = serde_json::to_value(RecipeListResponse::from(set)).unwrap();
        assert_eq!(json["per_page"], 10);
        assert!(json["recipes"].is_array());
    }
}
