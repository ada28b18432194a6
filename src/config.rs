use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the search index and other local data live
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Recipe store backend configuration
    pub store: StoreConfig,
    /// JSON array of recipe rows indexed into an empty local store
    pub seed_path: Option<PathBuf>,
    /// Ingredient alias dictionary (embedded copy when unset)
    pub aliases_path: Option<PathBuf>,
    /// Region/country/course tables (embedded copy when unset)
    pub taxonomy_path: Option<PathBuf>,
    /// Recipes served when the store cannot answer (embedded copy when unset)
    pub fallback_path: Option<PathBuf>,
    /// Result cache lifetime in seconds (0 disables caching)
    pub cache_ttl_secs: u64,
    /// Per-strategy retrieval limit
    pub candidate_limit: usize,
    /// Maximum documents in a browse-all listing
    pub browse_limit: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local tantivy index under `data_dir/index`.
    #[default]
    Fts,
    /// PostgREST-compatible HTTP API.
    Rest,
    /// In-process list, loaded from `seed_path`.
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fts" | "tantivy" => Some(Self::Fts),
            "rest" | "postgrest" => Some(Self::Rest),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the HTTP store (rest backend only).
    pub url: Option<String>,
    /// Sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fts,
            url: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            store: StoreConfig::default(),
            seed_path: None,
            aliases_path: None,
            taxonomy_path: None,
            fallback_path: None,
            cache_ttl_secs: 30,
            candidate_limit: 100,
            browse_limit: 200,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("RECIPE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("RECIPE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("RECIPE_SEARCH_SEED_PATH") {
            config.seed_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("RECIPE_SEARCH_ALIASES_PATH") {
            config.aliases_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("RECIPE_SEARCH_TAXONOMY_PATH") {
            config.taxonomy_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("RECIPE_SEARCH_FALLBACK_PATH") {
            config.fallback_path = Some(PathBuf::from(path));
        }
        if let Ok(val) = std::env::var("RECIPE_SEARCH_CACHE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.cache_ttl_secs = v;
            }
        }
        if let Ok(val) = std::env::var("RECIPE_SEARCH_CANDIDATE_LIMIT") {
            if let Ok(v) = val.parse::<usize>() {
                config.candidate_limit = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("RECIPE_SEARCH_BROWSE_LIMIT") {
            if let Ok(v) = val.parse::<usize>() {
                config.browse_limit = v.max(1);
            }
        }

        // Store config
        if let Ok(backend) = std::env::var("RECIPE_STORE_BACKEND") {
            match StoreBackend::parse(&backend) {
                Some(b) => config.store.backend = b,
                None => tracing::warn!("Unknown RECIPE_STORE_BACKEND '{backend}', using fts"),
            }
        }
        if let Ok(url) = std::env::var("RECIPE_STORE_URL") {
            config.store.url = Some(url);
        }
        if let Ok(key) = std::env::var("RECIPE_STORE_API_KEY") {
            config.store.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("RECIPE_STORE_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.store.timeout_secs = v.clamp(1, 30);
            }
        }

        config
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
