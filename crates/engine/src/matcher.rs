use regex::Regex;
use tally_core::{Pattern, StatementRecord};

use crate::error::PatternError;

/// A pattern paired with its precompiled regex.
///
/// Full-match modes get an anchored copy of the regex so a single
/// `is_match` tests the whole value.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: Pattern,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(pattern: &Pattern) -> Result<Self, PatternError> {
        let error = |source| PatternError {
            pattern_id: pattern.id,
            regex: pattern.regex.clone(),
            source,
        };

        // Validate the raw expression first; wrapping can make some broken
        // inputs (e.g. "a)|(b") parse.
        let raw = Regex::new(&pattern.regex).map_err(error)?;
        let regex = if pattern.match_mode.is_full() {
            Regex::new(&format!(r"\A(?:{})\z", pattern.regex)).map_err(error)?
        } else {
            raw
        };

        Ok(Self {
            pattern: pattern.clone(),
            regex,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// True if any targeted field satisfies the regex. Exclusion modes are
    /// not inverted here; callers decide what a hit means.
    pub fn is_match(&self, record: &StatementRecord) -> bool {
        self.pattern.targets().iter().any(|&target| {
            let value = record.target_value(target);
            if self.pattern.squish_data {
                self.regex.is_match(&squish(&value))
            } else {
                self.regex.is_match(&value)
            }
        })
    }
}

/// Tests one pattern against one statement, compiling the regex on the spot.
pub fn matches(record: &StatementRecord, pattern: &Pattern) -> Result<bool, PatternError> {
    Ok(CompiledPattern::compile(pattern)?.is_match(record))
}

fn squish(value: &str) -> String {
    value.replace(' ', "")
}
