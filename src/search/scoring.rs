use crate::models::{CandidateDocument, SortMode};

const TITLE_WEIGHT: f32 = 3.0;
const INGREDIENT_WEIGHT: f32 = 2.0;
const SUMMARY_WEIGHT: f32 = 1.0;
const INSTRUCTION_WEIGHT: f32 = 0.5;
/// Query token found inside a title word but not as a whole word.
const PARTIAL_TITLE_BONUS: f32 = 1.5;
/// Multi-word query found verbatim in the title.
const PHRASE_TITLE_BONUS: f32 = 5.0;

/// Lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Field-weighted term-frequency relevance of `doc` for `query`.
///
/// Every occurrence of a query token adds its field weight, so a document
/// with more or stronger matches never scores below an otherwise identical
/// one with fewer.
pub fn score(doc: &CandidateDocument, query: &str) -> f32 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let title = tokenize(&doc.title);
    let summary = doc.summary.as_deref().map(tokenize).unwrap_or_default();
    let ingredients = tokenize(&doc.ingredient_text());
    let instructions = tokenize(&doc.recipe.instructions.join(" "));

    let mut total = 0.0f32;
    for token in &query_tokens {
        let in_title = occurrences(&title, token);
        total += TITLE_WEIGHT * in_title as f32
            + INGREDIENT_WEIGHT * occurrences(&ingredients, token) as f32
            + SUMMARY_WEIGHT * occurrences(&summary, token) as f32
            + INSTRUCTION_WEIGHT * occurrences(&instructions, token) as f32;

        if in_title == 0 && title.iter().any(|w| w.contains(token.as_str())) {
            total += PARTIAL_TITLE_BONUS;
        }
    }

    if query_tokens.len() > 1 {
        let phrase = query_tokens.join(" ");
        if title.join(" ").contains(&phrase) {
            total += PHRASE_TITLE_BONUS;
        }
    }

    total
}

fn occurrences(tokens: &[String], token: &str) -> usize {
    tokens.iter().filter(|t| t.as_str() == token).count()
}

/// Sort by descending relevance, keeping the incoming order among equal
/// scores, and keep at most `limit` documents.
pub fn rank(docs: Vec<CandidateDocument>, query: &str, limit: usize) -> Vec<CandidateDocument> {
    let mut scored: Vec<(f32, CandidateDocument)> =
        docs.into_iter().map(|d| (score(&d, query), d)).collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);
    scored.into_iter().map(|(_, d)| d).collect()
}

/// Apply a non-relevance sort mode. Relevance leaves the order untouched;
/// callers rank separately when free text is present.
pub fn sort_by_mode(docs: &mut [CandidateDocument], mode: SortMode) {
    match mode {
        SortMode::Relevance => {}
        SortMode::Trending => docs.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score)),
        // Option orders None first, so reversing puts undated documents last
        SortMode::Newest => docs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;
    use chrono::{TimeZone, Utc};

    fn doc(id: &str, title: &str) -> CandidateDocument {
        CandidateDocument::new(id, title)
    }

    fn with_ingredients(mut d: CandidateDocument, names: &[&str]) -> CandidateDocument {
        d.recipe.ingredients = names
            .iter()
            .map(|n| Ingredient {
                name: n.to_string(),
                quantity: None,
                unit: None,
            })
            .collect();
        d
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Mac & Cheese, baked!"), vec!["mac", "cheese", "baked"]);
        assert!(tokenize("  ").is_empty());
    }

    #[test]
    fn test_title_outweighs_ingredients() {
        let title_hit = doc("1", "Basil Pesto");
        let ingredient_hit = with_ingredients(doc("2", "Green Pasta"), &["basil"]);
        assert!(score(&title_hit, "basil") > score(&ingredient_hit, "basil"));
    }

    #[test]
    fn test_more_matches_never_score_lower() {
        let base = with_ingredients(doc("1", "Tomato Soup"), &["tomato"]);
        let richer = with_ingredients(doc("1", "Tomato Soup"), &["tomato", "tomato paste"]);
        assert!(score(&richer, "tomato") > score(&base, "tomato"));
    }

    #[test]
    fn test_partial_title_match_scores_below_whole_word() {
        let partial = doc("1", "Meatballs");
        let whole = doc("2", "Meat Pie");
        let q = "meat";
        assert!(score(&partial, q) > 0.0);
        assert!(score(&whole, q) > score(&partial, q));
    }

    #[test]
    fn test_phrase_bonus() {
        let phrase = doc("1", "Butter Chicken");
        let scattered = doc("2", "Chicken with Butter");
        assert!(score(&phrase, "butter chicken") > score(&scattered, "butter chicken"));
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(score(&doc("1", "Anything"), "  "), 0.0);
    }

    #[test]
    fn test_rank_is_stable_and_bounded() {
        let docs = vec![
            doc("a", "Salad"),
            doc("b", "Pizza"),
            doc("c", "Soup"),
            doc("d", "Pizza Bianca"),
        ];
        let ranked = rank(docs.clone(), "pizza", 10);
        let ids: Vec<&str> = ranked.iter().map(|d| d.id.as_str()).collect();
        // equal-score documents keep their input order
        assert_eq!(ids, vec!["b", "d", "a", "c"]);

        assert_eq!(rank(docs.clone(), "pizza", 2).len(), 2);
        assert_eq!(rank(docs.clone(), "pizza", 10), rank(docs, "pizza", 10));
    }

    #[test]
    fn test_sort_modes() {
        let mut a = doc("a", "A");
        a.trending_score = 1.0;
        a.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut b = doc("b", "B");
        b.trending_score = 9.0;
        let mut c = doc("c", "C");
        c.created_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let mut docs = vec![a.clone(), b.clone(), c.clone()];
        sort_by_mode(&mut docs, SortMode::Trending);
        assert_eq!(docs[0].id, "b");

        let mut docs = vec![a, b, c];
        sort_by_mode(&mut docs, SortMode::Newest);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
