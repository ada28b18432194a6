use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const EMBEDDED_ALIASES: &str = include_str!("../../assets/ingredient_aliases.json");

#[derive(Deserialize)]
struct AliasFile {
    groups: Vec<Vec<String>>,
}

/// Multilingual ingredient dictionary. Each group holds interchangeable
/// names for one ingredient (English, regional and translated forms).
#[derive(Debug, Clone, Default)]
pub struct AliasDictionary {
    groups: Vec<Vec<String>>,
    /// member -> indices of the groups it belongs to, ascending
    index: HashMap<String, Vec<usize>>,
}

impl AliasDictionary {
    /// Dictionary shipped with the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_ALIASES).context("Embedded alias dictionary is malformed")
    }

    /// Load from `path`, or the embedded dictionary when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let data = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read alias dictionary {}", p.display()))?;
                Self::from_json(&data)
                    .with_context(|| format!("Failed to parse alias dictionary {}", p.display()))
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let file: AliasFile = serde_json::from_str(data)?;
        Ok(Self::from_groups(file.groups))
    }

    pub fn from_groups<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized_groups = Vec::new();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();

        for group in groups {
            let mut members: Vec<String> = Vec::new();
            for member in group {
                let m = normalize(member.as_ref());
                if !m.is_empty() && !members.contains(&m) {
                    members.push(m);
                }
            }
            if members.len() < 2 {
                continue;
            }
            let gi = normalized_groups.len();
            for m in &members {
                index.entry(m.clone()).or_default().push(gi);
            }
            normalized_groups.push(members);
        }

        Self {
            groups: normalized_groups,
            index,
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Expand a free-text phrase into its search variants.
    ///
    /// The normalized phrase always comes first, followed by whole-phrase
    /// aliases and then per-word substitutions, each in dictionary order.
    /// Blank input and `*` expand to nothing.
    pub fn expand(&self, term: &str) -> Vec<String> {
        let phrase = normalize(term);
        if phrase.is_empty() || phrase == "*" {
            return Vec::new();
        }

        let mut out = vec![phrase.clone()];
        for alias in self.aliases_of(&phrase) {
            push_unique(&mut out, alias.to_string());
        }

        let words: Vec<&str> = phrase.split(' ').collect();
        if words.len() > 1 {
            for (i, word) in words.iter().enumerate() {
                for alias in self.aliases_of(word) {
                    let mut variant = words.clone();
                    variant[i] = alias;
                    push_unique(&mut out, variant.join(" "));
                }
            }
        }

        out
    }

    fn aliases_of<'a>(&'a self, member: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.index
            .get(member)
            .into_iter()
            .flatten()
            .flat_map(move |gi| self.groups[*gi].iter())
            .map(String::as_str)
            .filter(move |alias| *alias != member)
    }
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Lowercase, trim and collapse internal whitespace.
fn normalize(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> AliasDictionary {
        AliasDictionary::from_groups(vec![
            vec!["chicken", "pollo", "murgh"],
            vec!["Potato", "aloo", "papa"],
            vec!["chickpea", "chana"],
        ])
    }

    #[test]
    fn test_unknown_term_expands_to_itself() {
        assert_eq!(dict().expand("Quinoa"), vec!["quinoa"]);
    }

    #[test]
    fn test_blank_and_star_expand_to_nothing() {
        assert!(dict().expand("").is_empty());
        assert!(dict().expand("   ").is_empty());
        assert!(dict().expand("*").is_empty());
    }

    #[test]
    fn test_raw_term_first_then_aliases_in_order() {
        assert_eq!(dict().expand("POLLO"), vec!["pollo", "chicken", "murgh"]);
    }

    #[test]
    fn test_multi_word_substitution() {
        let terms = dict().expand("aloo  gobi");
        assert_eq!(terms, vec!["aloo gobi", "potato gobi", "papa gobi"]);
    }

    #[test]
    fn test_does_not_match_partial_words() {
        // "chick" is not a member even though "chickpea" starts with it
        assert_eq!(dict().expand("chick"), vec!["chick"]);
    }

    #[test]
    fn test_duplicate_variants_removed() {
        let d = AliasDictionary::from_groups(vec![vec!["chili", "chile"], vec!["chile", "aji"]]);
        assert_eq!(d.expand("chile"), vec!["chile", "chili", "aji"]);
    }

    #[test]
    fn test_singleton_groups_dropped() {
        let d = AliasDictionary::from_groups(vec![vec!["salt"], vec!["Salt", "salt"]]);
        assert_eq!(d.group_count(), 0);
    }

    #[test]
    fn test_embedded_dictionary_loads() {
        let d = AliasDictionary::embedded().unwrap();
        assert!(d.group_count() > 10);
        let terms = d.expand("garbanzo");
        assert_eq!(terms[0], "garbanzo");
        assert!(terms.contains(&"chickpea".to_string()));
    }
}
