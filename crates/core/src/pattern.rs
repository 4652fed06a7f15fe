use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{AccountId, CategoryId, PatternId, TagId};

/// How a pattern's regex is tested against a field value.
///
/// `Partial*` looks for the regex anywhere in the value, `Full*` requires the
/// whole value to match. The `No*` variants test exactly like their positive
/// counterpart; they only mark the pattern as an exclusion vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    PartialMatch,
    FullMatch,
    NoPartialMatch,
    NoFullMatch,
}

impl MatchMode {
    pub fn is_exclusion(self) -> bool {
        matches!(self, MatchMode::NoPartialMatch | MatchMode::NoFullMatch)
    }

    pub fn is_full(self) -> bool {
        matches!(self, MatchMode::FullMatch | MatchMode::NoFullMatch)
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::PartialMatch => write!(f, "partial_match"),
            MatchMode::FullMatch => write!(f, "full_match"),
            MatchMode::NoPartialMatch => write!(f, "no_partial_match"),
            MatchMode::NoFullMatch => write!(f, "no_full_match"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "partial_match" => Ok(MatchMode::PartialMatch),
            "full_match" => Ok(MatchMode::FullMatch),
            "no_partial_match" => Ok(MatchMode::NoPartialMatch),
            "no_full_match" => Ok(MatchMode::NoFullMatch),
            other => Err(format!("Unknown match mode: '{other}'")),
        }
    }
}

/// Statement field a pattern can be tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTarget {
    BookingDate,
    ValueDate,
    Type,
    Amount,
    Currency,
    Purpose,
    CreditorId,
    MandateReference,
    CustomerReference,
    PaymentInformationId,
    ThirdPartyName,
    ThirdPartyAccount,
    ThirdPartyBankCode,
}

impl MatchTarget {
    /// Every target, in the order used when a pattern names none.
    pub const ALL: [MatchTarget; 13] = [
        MatchTarget::BookingDate,
        MatchTarget::ValueDate,
        MatchTarget::Type,
        MatchTarget::Amount,
        MatchTarget::Currency,
        MatchTarget::Purpose,
        MatchTarget::CreditorId,
        MatchTarget::MandateReference,
        MatchTarget::CustomerReference,
        MatchTarget::PaymentInformationId,
        MatchTarget::ThirdPartyName,
        MatchTarget::ThirdPartyAccount,
        MatchTarget::ThirdPartyBankCode,
    ];
}

/// The rule shape shared by category and tag patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub regex: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Empty means every field in [`MatchTarget::ALL`].
    #[serde(default)]
    pub match_targets: Vec<MatchTarget>,
    /// Strip spaces from field values before testing.
    #[serde(default)]
    pub squish_data: bool,
    /// Empty means every account.
    #[serde(default)]
    pub account_targets: Vec<AccountId>,
}

impl Pattern {
    pub fn new(id: PatternId, regex: &str, match_mode: MatchMode) -> Self {
        Pattern {
            id,
            regex: regex.to_string(),
            match_mode,
            match_targets: Vec::new(),
            squish_data: false,
            account_targets: Vec::new(),
        }
    }

    pub fn targets(&self) -> &[MatchTarget] {
        if self.match_targets.is_empty() {
            &MatchTarget::ALL
        } else {
            &self.match_targets
        }
    }

    pub fn applies_to_account(&self, account_id: AccountId) -> bool {
        self.account_targets.is_empty() || self.account_targets.contains(&account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPattern {
    #[serde(flatten)]
    pub pattern: Pattern,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPattern {
    #[serde(flatten)]
    pub pattern: Pattern,
    pub tag_id: TagId,
}
