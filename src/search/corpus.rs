use anyhow::{Context, Result};
use std::path::Path;

use crate::models::CandidateDocument;
use crate::store::memory::parse_documents;

const EMBEDDED_CORPUS: &str = include_str!("../../assets/fallback_recipes.json");

/// Small static recipe set served when the store cannot answer.
#[derive(Debug, Clone, Default)]
pub struct FallbackCorpus {
    documents: Vec<CandidateDocument>,
}

impl FallbackCorpus {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CORPUS).context("Embedded fallback corpus is malformed")
    }

    /// Read the corpus from `path`, or use the embedded one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let data = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read fallback corpus {}", p.display()))?;
                Self::from_json(&data)
                    .with_context(|| format!("Failed to parse fallback corpus {}", p.display()))
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(Self::new(parse_documents(data)?))
    }

    pub fn new(documents: Vec<CandidateDocument>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[CandidateDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
