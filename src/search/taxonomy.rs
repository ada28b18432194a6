use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const EMBEDDED_TAXONOMY: &str = include_str!("../../assets/taxonomy.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub food_tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Static region -> country -> food-tag and course -> tag tables.
#[derive(Debug, Clone, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

impl Taxonomy {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_TAXONOMY).context("Embedded taxonomy is malformed")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let data = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read taxonomy {}", p.display()))?;
                Self::from_json(&data)
                    .with_context(|| format!("Failed to parse taxonomy {}", p.display()))
            }
            None => Self::embedded(),
        }
    }

    /// Parse, lowercase every keyword, and check that each country belongs
    /// to exactly one region.
    pub fn from_json(data: &str) -> Result<Self> {
        let mut taxonomy: Taxonomy = serde_json::from_str(data)?;

        let mut seen = HashSet::new();
        for region in &mut taxonomy.regions {
            for country in &mut region.countries {
                if !seen.insert(country.id.to_lowercase()) {
                    bail!(
                        "Country '{}' is listed in more than one region",
                        country.id
                    );
                }
                lowercase_all(&mut country.food_tags);
            }
        }
        for course in &mut taxonomy.courses {
            lowercase_all(&mut course.tags);
        }

        Ok(taxonomy)
    }

    /// Look up a region by id or label, case-insensitively.
    pub fn region(&self, key: &str) -> Option<&Region> {
        let key = key.trim();
        self.regions.iter().find(|r| matches_key(&r.id, &r.label, key))
    }

    /// Look up a country and the region that owns it.
    pub fn country(&self, key: &str) -> Option<(&Region, &Country)> {
        let key = key.trim();
        self.regions.iter().find_map(|r| {
            r.countries
                .iter()
                .find(|c| matches_key(&c.id, &c.label, key))
                .map(|c| (r, c))
        })
    }

    pub fn course(&self, key: &str) -> Option<&Course> {
        let key = key.trim();
        self.courses.iter().find(|c| matches_key(&c.id, &c.label, key))
    }
}

impl Region {
    /// Region label plus the food tags of every country in the region.
    pub fn keywords(&self) -> Vec<String> {
        let mut out = vec![self.label.to_lowercase()];
        for country in &self.countries {
            for tag in &country.food_tags {
                if !out.contains(tag) {
                    out.push(tag.clone());
                }
            }
        }
        out
    }
}

impl Country {
    pub fn keywords(&self) -> Vec<String> {
        let mut out = vec![self.label.to_lowercase()];
        out.extend(self.food_tags.iter().cloned());
        out
    }
}

impl Course {
    pub fn keywords(&self) -> Vec<String> {
        let mut out = vec![self.label.to_lowercase()];
        out.extend(self.tags.iter().cloned());
        out
    }
}

fn matches_key(id: &str, label: &str, key: &str) -> bool {
    id.eq_ignore_ascii_case(key) || label.eq_ignore_ascii_case(key)
}

fn lowercase_all(items: &mut [String]) {
    for item in items {
        *item = item.trim().to_lowercase();
    }
}
