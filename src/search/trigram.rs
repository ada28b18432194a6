//! Trigram similarity in the style of PostgreSQL's `pg_trgm`.
//!
//! Each word is lowercased and padded with two leading and one trailing
//! space before being cut into three-character windows, so short words and
//! word starts carry weight. Similarity is the Jaccard index of the two
//! trigram sets.

use std::collections::HashSet;

/// Minimum similarity for the in-memory fuzzy strategy to accept a match.
pub const SIMILARITY_THRESHOLD: f32 = 0.3;

pub fn trigrams(text: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    for word in words(text) {
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

pub fn similarity(a: &str, b: &str) -> f32 {
    jaccard(&trigrams(a), &trigrams(b))
}

/// Average, over the words of `query`, of the best similarity between that
/// word and any word of `text`. Tolerates extra words in `text`, which a
/// whole-string comparison would penalize.
pub fn word_similarity(query: &str, text: &str) -> f32 {
    let query_words: Vec<String> = words(query).collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_grams: Vec<HashSet<String>> = words(text).map(|w| trigrams(&w)).collect();
    if text_grams.is_empty() {
        return 0.0;
    }

    let total: f32 = query_words
        .iter()
        .map(|qw| {
            let q = trigrams(qw);
            text_grams
                .iter()
                .map(|t| jaccard(&q, t))
                .fold(0.0f32, f32::max)
        })
        .sum();
    total / query_words.len() as f32
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f32 / union as f32
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}
