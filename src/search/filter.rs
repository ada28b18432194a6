use std::sync::Arc;

use crate::models::{CandidateDocument, SearchQuery};
use crate::search::taxonomy::Taxonomy;

/// Geographic and course narrowing over retrieved candidates.
///
/// Every step is advisory: when a step would leave nothing, it is skipped
/// and the set from before that step is kept.
#[derive(Debug, Clone)]
pub struct PostFilter {
    taxonomy: Arc<Taxonomy>,
}

impl PostFilter {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn apply(
        &self,
        docs: Vec<CandidateDocument>,
        region: Option<&str>,
        country: Option<&str>,
        course: Option<&str>,
    ) -> Vec<CandidateDocument> {
        let mut docs = docs;

        let region = region.and_then(|r| self.taxonomy.region(r));
        let country = country.and_then(|c| self.taxonomy.country(c));

        match (region, country) {
            (Some(region), Some((owner, country))) if owner.id == region.id => {
                docs = narrow(docs, &country.keywords(), "country");
            }
            (Some(region), _) => {
                docs = narrow(docs, &region.keywords(), "region");
            }
            (None, Some((_, country))) => {
                docs = narrow(docs, &country.keywords(), "country");
            }
            (None, None) => {}
        }

        if let Some(course) = course.and_then(|c| self.taxonomy.course(c)) {
            docs = narrow(docs, &course.keywords(), "course");
        }

        docs
    }
}

/// Keep documents whose searchable text contains any keyword, unless that
/// would empty the set.
fn narrow(docs: Vec<CandidateDocument>, keywords: &[String], step: &str) -> Vec<CandidateDocument> {
    if docs.is_empty() || keywords.is_empty() {
        return docs;
    }
    let before = docs.len();
    let (kept, rest): (Vec<_>, Vec<_>) = docs.into_iter().partition(|d| {
        let text = d.searchable_text();
        keywords.iter().any(|k| text.contains(k.as_str()))
    });

    if kept.is_empty() {
        tracing::debug!(step, before, "{step} filter matched nothing, keeping unfiltered set");
        return rest;
    }
    tracing::debug!(step, before, after = kept.len(), "{step} filter applied");
    kept
}

/// Strict catalog facets: content type, diet tags and hierarchy ids.
/// Unlike the taxonomy narrowing these may produce an empty set.
pub fn apply_structured(docs: Vec<CandidateDocument>, query: &SearchQuery) -> Vec<CandidateDocument> {
    let hierarchy = &query.hierarchy;
    docs.into_iter()
        .filter(|d| query.content_type.map_or(true, |t| d.content_type == t))
        .filter(|d| {
            query
                .diet_tags
                .iter()
                .all(|tag| d.diet_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
        })
        .filter(|d| id_matches(&hierarchy.cuisine_id, &d.cuisine_id))
        .filter(|d| id_matches(&hierarchy.food_style_id, &d.food_style_id))
        .filter(|d| id_matches(&hierarchy.cookbook_id, &d.cookbook_id))
        .filter(|d| id_matches(&hierarchy.chapter_id, &d.chapter_id))
        .collect()
}

fn id_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.as_deref() == Some(w.as_str()),
    }
}
