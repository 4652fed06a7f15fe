use serde::{Deserialize, Serialize};

use crate::ids::StatementId;

/// Two statements recognised as both sides of one transfer.
///
/// `first_statement_id` is the outgoing (negative) side and
/// `second_statement_id` the incoming (positive) side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementLink {
    pub first_statement_id: StatementId,
    pub second_statement_id: StatementId,
}

impl StatementLink {
    pub fn new(first_statement_id: StatementId, second_statement_id: StatementId) -> Self {
        StatementLink {
            first_statement_id,
            second_statement_id,
        }
    }

    pub fn involves(&self, id: StatementId) -> bool {
        self.first_statement_id == id || self.second_statement_id == id
    }
}
