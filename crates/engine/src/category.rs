use std::collections::{BTreeMap, BTreeSet};

use tally_core::{Category, CategoryId, CategoryPattern, StatementRecord};
use tracing::trace;

use crate::error::{ConfigurationError, PatternError};
use crate::matcher::CompiledPattern;

/// The single category flagged as default.
pub fn default_category(categories: &[Category]) -> Result<CategoryId, ConfigurationError> {
    let defaults: Vec<CategoryId> = categories
        .iter()
        .filter(|c| c.is_default)
        .map(|c| c.id)
        .collect();

    match defaults.as_slice() {
        [] => Err(ConfigurationError::NoDefaultCategory),
        [id] => Ok(*id),
        _ => Err(ConfigurationError::MultipleDefaultCategories(defaults)),
    }
}

/// Category patterns compiled once for a classification run.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    patterns: Vec<(CompiledPattern, CategoryId)>,
}

impl CategoryResolver {
    pub fn new(patterns: &[CategoryPattern]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|cp| Ok((CompiledPattern::compile(&cp.pattern)?, cp.category_id)))
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { patterns })
    }

    /// Picks the category with the most votes.
    ///
    /// Each inclusive hit is one vote; any exclusion hit removes the category
    /// entirely. Every entry in `preferred` that is not excluded adds
    /// `max_votes + 1`, so a tag preference beats any pattern-only result and
    /// repeated preferences stack. Equal scores go to the lowest category id.
    pub fn resolve(
        &self,
        record: &StatementRecord,
        default_category_id: CategoryId,
        preferred: &[CategoryId],
    ) -> CategoryId {
        let mut votes: BTreeMap<CategoryId, u64> = BTreeMap::new();
        let mut excluded: BTreeSet<CategoryId> = BTreeSet::new();

        for (compiled, category_id) in &self.patterns {
            let pattern = compiled.pattern();
            if !pattern.applies_to_account(record.account_id) || !compiled.is_match(record) {
                continue;
            }
            if pattern.match_mode.is_exclusion() {
                excluded.insert(*category_id);
            } else {
                *votes.entry(*category_id).or_insert(0) += 1;
            }
        }

        votes.retain(|id, _| !excluded.contains(id));
        let max_votes = votes.values().copied().max().unwrap_or(0);

        for id in preferred.iter().filter(|id| !excluded.contains(*id)) {
            *votes.entry(*id).or_insert(0) += max_votes + 1;
        }

        trace!(?votes, ?excluded, "category votes");

        votes
            .iter()
            .fold(None, |best: Option<(CategoryId, u64)>, (&id, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((id, score)),
            })
            .map(|(id, _)| id)
            .unwrap_or(default_category_id)
    }
}

pub fn resolve_category(
    record: &StatementRecord,
    patterns: &[CategoryPattern],
    default_category_id: CategoryId,
    preferred: &[CategoryId],
) -> Result<CategoryId, PatternError> {
    Ok(CategoryResolver::new(patterns)?.resolve(record, default_category_id, preferred))
}
