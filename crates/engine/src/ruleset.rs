use serde::{Deserialize, Serialize};
use tally_core::{Category, CategoryPattern, Tag, TagPattern};

use crate::classify::Classifier;
use crate::error::ClassifyError;

/// Categories, tags and patterns as written in a rules file.
///
/// ```toml
/// [[categories]]
/// id = 1
/// name = "Unsorted"
/// default = true
///
/// [[tag_patterns]]
/// id = 1
/// regex = "AMAZON"
/// match_targets = ["third_party_name"]
/// tag_id = 1
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub category_patterns: Vec<CategoryPattern>,
    #[serde(default)]
    pub tag_patterns: Vec<TagPattern>,
}

impl RuleSet {
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))
    }

    /// Applies `other` on top of this set: entries with a matching id are
    /// replaced, new ones appended.
    pub fn merge(&mut self, other: RuleSet) {
        upsert(&mut self.categories, other.categories, |c| c.id.0);
        upsert(&mut self.tags, other.tags, |t| t.id.0);
        upsert(&mut self.category_patterns, other.category_patterns, |cp| cp.pattern.id.0);
        upsert(&mut self.tag_patterns, other.tag_patterns, |tp| tp.pattern.id.0);
    }

    /// Checks the default category, every rule reference and every regex
    /// without classifying anything.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        self.classifier().map(|_| ())
    }

    pub fn classifier(&self) -> Result<Classifier, ClassifyError> {
        Classifier::new(
            &self.tags,
            &self.tag_patterns,
            &self.category_patterns,
            &self.categories,
        )
    }
}

fn upsert<T>(items: &mut Vec<T>, incoming: Vec<T>, key: impl Fn(&T) -> i64) {
    for item in incoming {
        match items.iter_mut().find(|existing| key(existing) == key(&item)) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }
}
