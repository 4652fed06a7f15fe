use std::collections::BTreeSet;

use tally_core::{StatementRecord, TagId, TagPattern};

use crate::error::PatternError;
use crate::matcher::CompiledPattern;

/// Tag patterns compiled once for a classification run.
#[derive(Debug, Clone)]
pub struct TagResolver {
    patterns: Vec<(CompiledPattern, TagId)>,
}

impl TagResolver {
    pub fn new(patterns: &[TagPattern]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|tp| Ok((CompiledPattern::compile(&tp.pattern)?, tp.tag_id)))
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { patterns })
    }

    /// Tags whose inclusive patterns hit and no exclusion pattern hit.
    pub fn resolve(&self, record: &StatementRecord) -> BTreeSet<TagId> {
        let mut matched = BTreeSet::new();
        let mut excluded = BTreeSet::new();

        for (compiled, tag_id) in &self.patterns {
            let pattern = compiled.pattern();
            if !pattern.applies_to_account(record.account_id) || !compiled.is_match(record) {
                continue;
            }
            if pattern.match_mode.is_exclusion() {
                excluded.insert(*tag_id);
            } else {
                matched.insert(*tag_id);
            }
        }

        matched.difference(&excluded).copied().collect()
    }
}

pub fn resolve_tags(
    record: &StatementRecord,
    patterns: &[TagPattern],
) -> Result<BTreeSet<TagId>, PatternError> {
    Ok(TagResolver::new(patterns)?.resolve(record))
}
