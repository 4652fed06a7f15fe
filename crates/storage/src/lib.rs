pub mod db;
pub mod links;
pub mod rules;
pub mod statements;

use tally_core::{Category, CategoryPattern, Statement, Tag, TagPattern};

pub use db::{create_db, DbPool, StorageError};
pub use links::{get_links, replace_links};
pub use rules::{
    delete_category, get_categories, get_category_patterns, get_tag_patterns, get_tags,
    load_rule_set, save_category, save_category_pattern, save_rule_set, save_tag,
    save_tag_pattern,
};
pub use statements::{
    apply_classifications, get_statement, get_statements, insert_statement,
    set_statement_category, set_statement_tags,
};

/// Everything the engine reads, fetched once per run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub statements: Vec<Statement>,
    pub tags: Vec<Tag>,
    pub tag_patterns: Vec<TagPattern>,
    pub category_patterns: Vec<CategoryPattern>,
    pub categories: Vec<Category>,
}

pub async fn load_snapshot(pool: &DbPool) -> Result<Snapshot, StorageError> {
    Ok(Snapshot {
        statements: get_statements(pool).await?,
        tags: get_tags(pool).await?,
        tag_patterns: get_tag_patterns(pool).await?,
        category_patterns: get_category_patterns(pool).await?,
        categories: get_categories(pool).await?,
    })
}
