use tally_core::{CategoryId, PatternId, TagId};
use thiserror::Error;

/// A pattern whose regex does not compile.
#[derive(Debug, Clone, Error)]
#[error("Invalid regex in pattern {pattern_id} ('{regex}'): {source}")]
pub struct PatternError {
    pub pattern_id: PatternId,
    pub regex: String,
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("No category is marked as default")]
    NoDefaultCategory,
    #[error("More than one category is marked as default: {0:?}")]
    MultipleDefaultCategories(Vec<CategoryId>),
    #[error("Category pattern {pattern_id} votes for unknown category {category_id}")]
    UnknownPatternCategory {
        pattern_id: PatternId,
        category_id: CategoryId,
    },
    #[error("Tag pattern {pattern_id} assigns unknown tag {tag_id}")]
    UnknownPatternTag { pattern_id: PatternId, tag_id: TagId },
    #[error("Tag {tag_id} prefers unknown category {category_id}")]
    UnknownPreferredCategory { tag_id: TagId, category_id: CategoryId },
}

#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
