use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::hash::digest_fields;
use crate::ids::{AccountId, CategoryId, StatementId, TagId};
use crate::money::Amount;
use crate::pattern::MatchTarget;

/// Textual stand-in for an absent optional field.
pub const NULL_PLACEHOLDER: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatementState {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementState::Active => write!(f, "active"),
            StatementState::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for StatementState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StatementState::Active),
            "inactive" => Ok(StatementState::Inactive),
            other => Err(format!("Unknown statement state: '{other}'")),
        }
    }
}

/// A transaction record as an importer produces it: the account it was
/// booked on plus the bank-supplied content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub account_id: AccountId,
    pub booking_date: NaiveDate,
    pub value_date: NaiveDate,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: Amount,
    pub currency: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub creditor_id: Option<String>,
    #[serde(default)]
    pub mandate_reference: Option<String>,
    #[serde(default)]
    pub customer_reference: Option<String>,
    #[serde(default)]
    pub payment_information_id: Option<String>,
    #[serde(default)]
    pub third_party_name: Option<String>,
    #[serde(default)]
    pub third_party_account: Option<String>,
    #[serde(default)]
    pub third_party_bank_code: Option<String>,
}

impl StatementRecord {
    /// Textual value of a field as patterns see it. Absent optional fields
    /// read as [`NULL_PLACEHOLDER`].
    pub fn target_value(&self, target: MatchTarget) -> String {
        fn text(value: &Option<String>) -> String {
            value.as_deref().unwrap_or(NULL_PLACEHOLDER).to_string()
        }

        match target {
            MatchTarget::BookingDate => self.booking_date.to_string(),
            MatchTarget::ValueDate => self.value_date.to_string(),
            MatchTarget::Type => self.transaction_type.clone(),
            MatchTarget::Amount => self.amount.to_string(),
            MatchTarget::Currency => self.currency.clone(),
            MatchTarget::Purpose => text(&self.purpose),
            MatchTarget::CreditorId => text(&self.creditor_id),
            MatchTarget::MandateReference => text(&self.mandate_reference),
            MatchTarget::CustomerReference => text(&self.customer_reference),
            MatchTarget::PaymentInformationId => text(&self.payment_information_id),
            MatchTarget::ThirdPartyName => text(&self.third_party_name),
            MatchTarget::ThirdPartyAccount => text(&self.third_party_account),
            MatchTarget::ThirdPartyBankCode => text(&self.third_party_bank_code),
        }
    }

    /// Deduplication key for imports. Booking date and third party name are
    /// left out since banks revise them after the fact.
    pub fn id_hash(&self) -> String {
        let fields = [
            MatchTarget::ValueDate,
            MatchTarget::Type,
            MatchTarget::Purpose,
            MatchTarget::Currency,
            MatchTarget::Amount,
            MatchTarget::CreditorId,
            MatchTarget::MandateReference,
            MatchTarget::CustomerReference,
            MatchTarget::PaymentInformationId,
            MatchTarget::ThirdPartyAccount,
            MatchTarget::ThirdPartyBankCode,
        ]
        .map(|t| match t {
            // Scale is not part of identity: "-50.0" and "-50.00" are one amount.
            MatchTarget::Amount => self.amount.normalized().to_string(),
            _ => self.target_value(t),
        });
        digest_fields(fields.iter().map(String::as_str))
    }

    /// Changes when a re-imported record was revised by the bank.
    pub fn content_hash(&self) -> String {
        let fields = [MatchTarget::BookingDate, MatchTarget::ThirdPartyName].map(|t| self.target_value(t));
        digest_fields(fields.iter().map(String::as_str))
    }
}

/// A stored statement with the attributes the engine maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    #[serde(flatten)]
    pub record: StatementRecord,
    pub category_id: CategoryId,
    #[serde(default)]
    pub tag_ids: BTreeSet<TagId>,
    /// User pinned the category; auto-classification leaves it alone.
    #[serde(default)]
    pub manual_category: bool,
    /// User pinned the tag set; auto-classification leaves it alone.
    #[serde(default)]
    pub manual_tags: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub state: StatementState,
}

impl Statement {
    pub fn new(id: StatementId, record: StatementRecord, category_id: CategoryId) -> Self {
        Statement {
            id,
            record,
            category_id,
            tag_ids: BTreeSet::new(),
            manual_category: false,
            manual_tags: false,
            comment: None,
            state: StatementState::Active,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.record.account_id
    }

    pub fn amount(&self) -> Amount {
        self.record.amount
    }
}
