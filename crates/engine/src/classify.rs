use std::collections::{BTreeMap, BTreeSet};

use tally_core::{
    Category, CategoryId, CategoryPattern, Statement, StatementId, StatementRecord, Tag, TagId,
    TagPattern,
};
use tracing::{debug, info, warn};

use crate::category::{default_category, CategoryResolver};
use crate::error::{ClassifyError, ConfigurationError};
use crate::tags::TagResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagUpdate {
    /// Tags are pinned by the user.
    Unchanged,
    /// Drop the current associations and store exactly these.
    Replace(BTreeSet<TagId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryUpdate {
    /// Category is pinned by the user and still exists.
    Unchanged,
    Assign(CategoryId),
}

/// Outcome of classifying one statement, to be applied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub statement_id: StatementId,
    pub tags: TagUpdate,
    pub category: CategoryUpdate,
}

impl Classification {
    pub fn is_unchanged(&self) -> bool {
        self.tags == TagUpdate::Unchanged && self.category == CategoryUpdate::Unchanged
    }
}

/// Everything needed to classify statements, validated and compiled up
/// front so a bad rule aborts before any statement is looked at.
#[derive(Debug, Clone)]
pub struct Classifier {
    tag_categories: BTreeMap<TagId, Option<CategoryId>>,
    category_ids: BTreeSet<CategoryId>,
    default_category_id: CategoryId,
    tag_resolver: TagResolver,
    category_resolver: CategoryResolver,
}

impl Classifier {
    pub fn new(
        tags: &[Tag],
        tag_patterns: &[TagPattern],
        category_patterns: &[CategoryPattern],
        categories: &[Category],
    ) -> Result<Self, ClassifyError> {
        let default_category_id = default_category(categories)?;
        check_references(tags, tag_patterns, category_patterns, categories)?;
        let tag_resolver = TagResolver::new(tag_patterns)?;
        let category_resolver = CategoryResolver::new(category_patterns)?;

        Ok(Self {
            tag_categories: tags.iter().map(|t| (t.id, t.category_id)).collect(),
            category_ids: categories.iter().map(|c| c.id).collect(),
            default_category_id,
            tag_resolver,
            category_resolver,
        })
    }

    pub fn default_category_id(&self) -> CategoryId {
        self.default_category_id
    }

    /// Distinct categories nominated by the given tags, in id order.
    pub fn preferred_categories(&self, tag_ids: &BTreeSet<TagId>) -> Vec<CategoryId> {
        let preferred: BTreeSet<CategoryId> = tag_ids
            .iter()
            .filter_map(|id| match self.tag_categories.get(id) {
                Some(category) => *category,
                None => {
                    warn!(tag_id = %id, "statement references unknown tag");
                    None
                }
            })
            .collect();
        preferred.into_iter().collect()
    }

    /// Classifies a record that has no stored state yet, e.g. during import.
    pub fn classify_record(&self, record: &StatementRecord) -> (CategoryId, BTreeSet<TagId>) {
        let tag_ids = self.tag_resolver.resolve(record);
        let preferred = self.preferred_categories(&tag_ids);
        let category_id = self
            .category_resolver
            .resolve(record, self.default_category_id, &preferred);
        (category_id, tag_ids)
    }

    /// Classifies a stored statement, honouring its manual flags.
    pub fn classify(&self, statement: &Statement) -> Classification {
        let (tags, tag_ids) = if statement.manual_tags {
            (TagUpdate::Unchanged, statement.tag_ids.clone())
        } else {
            let resolved = self.tag_resolver.resolve(&statement.record);
            (TagUpdate::Replace(resolved.clone()), resolved)
        };

        let category = if statement.manual_category
            && self.category_ids.contains(&statement.category_id)
        {
            CategoryUpdate::Unchanged
        } else {
            let preferred = self.preferred_categories(&tag_ids);
            CategoryUpdate::Assign(self.category_resolver.resolve(
                &statement.record,
                self.default_category_id,
                &preferred,
            ))
        };

        debug!(statement_id = %statement.id, ?tags, ?category, "classified statement");

        Classification {
            statement_id: statement.id,
            tags,
            category,
        }
    }

    pub fn classify_all(&self, statements: &[Statement]) -> Vec<Classification> {
        let results: Vec<Classification> = statements.iter().map(|s| self.classify(s)).collect();

        let retagged = results
            .iter()
            .filter(|c| matches!(c.tags, TagUpdate::Replace(_)))
            .count();
        let recategorized = results
            .iter()
            .filter(|c| matches!(c.category, CategoryUpdate::Assign(_)))
            .count();
        info!(
            statements = statements.len(),
            retagged, recategorized, "classification finished"
        );

        results
    }
}

/// Every category or tag a rule points at must exist, otherwise a pass could
/// assign an id the store cannot hold.
fn check_references(
    tags: &[Tag],
    tag_patterns: &[TagPattern],
    category_patterns: &[CategoryPattern],
    categories: &[Category],
) -> Result<(), ConfigurationError> {
    let category_ids: BTreeSet<CategoryId> = categories.iter().map(|c| c.id).collect();
    let tag_ids: BTreeSet<TagId> = tags.iter().map(|t| t.id).collect();

    if let Some(cp) = category_patterns
        .iter()
        .find(|cp| !category_ids.contains(&cp.category_id))
    {
        return Err(ConfigurationError::UnknownPatternCategory {
            pattern_id: cp.pattern.id,
            category_id: cp.category_id,
        });
    }

    if let Some(tp) = tag_patterns.iter().find(|tp| !tag_ids.contains(&tp.tag_id)) {
        return Err(ConfigurationError::UnknownPatternTag {
            pattern_id: tp.pattern.id,
            tag_id: tp.tag_id,
        });
    }

    for tag in tags {
        if let Some(category_id) = tag.category_id.filter(|id| !category_ids.contains(id)) {
            return Err(ConfigurationError::UnknownPreferredCategory {
                tag_id: tag.id,
                category_id,
            });
        }
    }

    Ok(())
}

/// Tags and category for a single record, ignoring any manual flags.
pub fn classify_statement(
    record: &StatementRecord,
    tags: &[Tag],
    tag_patterns: &[TagPattern],
    category_patterns: &[CategoryPattern],
    categories: &[Category],
) -> Result<(CategoryId, BTreeSet<TagId>), ClassifyError> {
    let classifier = Classifier::new(tags, tag_patterns, category_patterns, categories)?;
    Ok(classifier.classify_record(record))
}

/// Classifies every statement against one snapshot of rules.
pub fn classify_all(
    statements: &[Statement],
    tags: &[Tag],
    tag_patterns: &[TagPattern],
    category_patterns: &[CategoryPattern],
    categories: &[Category],
) -> Result<Vec<Classification>, ClassifyError> {
    let classifier = Classifier::new(tags, tag_patterns, category_patterns, categories)?;
    Ok(classifier.classify_all(statements))
}
