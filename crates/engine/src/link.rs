use tally_core::{CalendarPeriod, Statement, StatementLink};
use tracing::{debug, info};

/// Pairs statements across accounts that look like the two sides of one
/// transfer.
///
/// Matching is greedy and depends on input order: each statement, in turn,
/// takes its closest compatible partner from whatever is still unmatched.
pub struct TransferLinker {
    /// Largest day distance between the two value dates. Any whole month
    /// or year of distance disqualifies a pair regardless.
    pub max_day_span: u32,
}

impl Default for TransferLinker {
    fn default() -> Self {
        Self { max_day_span: 7 }
    }
}

impl TransferLinker {
    pub fn new(max_day_span: u32) -> Self {
        Self { max_day_span }
    }

    /// Builds the complete link set from scratch. No statement appears in
    /// more than one link.
    pub fn link_all(&self, statements: &[Statement]) -> Vec<StatementLink> {
        let mut pending: Vec<&Statement> = statements.iter().collect();
        let mut links = Vec::new();

        while !pending.is_empty() {
            let statement = pending.remove(0);

            let Some(index) = self.find_partner(statement, &pending) else {
                continue;
            };
            let partner = pending.remove(index);

            let link = if statement.amount().is_negative() {
                StatementLink::new(statement.id, partner.id)
            } else {
                StatementLink::new(partner.id, statement.id)
            };
            debug!(
                first = %link.first_statement_id,
                second = %link.second_statement_id,
                "linked transfer"
            );
            links.push(link);
        }

        info!(statements = statements.len(), links = links.len(), "linking finished");
        links
    }

    /// Index of the closest compatible candidate; the earliest one wins ties.
    fn find_partner(&self, statement: &Statement, candidates: &[&Statement]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, other)| self.day_distance(statement, other).map(|days| (idx, days)))
            .min_by_key(|&(_, days)| days)
            .map(|(idx, _)| idx)
    }

    /// Absolute day component between two compatible statements, or `None`
    /// if they cannot be two sides of one transfer.
    fn day_distance(&self, statement: &Statement, other: &Statement) -> Option<u32> {
        let (a, b) = (&statement.record, &other.record);
        if a.account_id == b.account_id || a.amount != -b.amount || a.currency != b.currency {
            return None;
        }

        let period = CalendarPeriod::between(a.value_date, b.value_date);
        period
            .within_days(self.max_day_span)
            .then(|| period.days.unsigned_abs())
    }
}

pub fn link_all(statements: &[Statement]) -> Vec<StatementLink> {
    TransferLinker::default().link_all(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use tally_core::{AccountId, Amount, CategoryId, StatementId, StatementRecord};

    fn tx(id: i64, account: i64, cents: i64, date: (i32, u32, u32)) -> Statement {
        tx_in(id, account, cents, date, "EUR")
    }

    fn tx_in(id: i64, account: i64, cents: i64, date: (i32, u32, u32), currency: &str) -> Statement {
        let value_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let record = StatementRecord {
            account_id: AccountId(account),
            booking_date: value_date,
            value_date,
            transaction_type: "TRANSFER".to_string(),
            amount: Amount::from_cents(cents),
            currency: currency.to_string(),
            purpose: None,
            creditor_id: None,
            mandate_reference: None,
            customer_reference: None,
            payment_information_id: None,
            third_party_name: None,
            third_party_account: None,
            third_party_bank_code: None,
        };
        Statement::new(StatementId(id), record, CategoryId(1))
    }

    fn link(first: i64, second: i64) -> StatementLink {
        StatementLink::new(StatementId(first), StatementId(second))
    }

    #[test]
    fn links_simple_transfer() {
        let statements = vec![tx(1, 1, -5000, (2024, 1, 10)), tx(2, 2, 5000, (2024, 1, 12))];
        assert_eq!(link_all(&statements), vec![link(1, 2)]);
    }

    #[test]
    fn orients_negative_side_first() {
        let statements = vec![tx(1, 2, 5000, (2024, 1, 12)), tx(2, 1, -5000, (2024, 1, 10))];
        assert_eq!(link_all(&statements), vec![link(2, 1)]);
    }

    #[test]
    fn same_account_is_never_linked() {
        let statements = vec![tx(1, 1, -5000, (2024, 1, 10)), tx(2, 1, 5000, (2024, 1, 10))];
        assert!(link_all(&statements).is_empty());
    }

    #[test]
    fn amount_must_offset_exactly() {
        let statements = vec![tx(1, 1, -5000, (2024, 1, 10)), tx(2, 2, 5001, (2024, 1, 10))];
        assert!(link_all(&statements).is_empty());

        let same_sign = vec![tx(1, 1, 5000, (2024, 1, 10)), tx(2, 2, 5000, (2024, 1, 10))];
        assert!(link_all(&same_sign).is_empty());
    }

    #[test]
    fn currency_must_match() {
        let statements = vec![
            tx_in(1, 1, -5000, (2024, 1, 10), "EUR"),
            tx_in(2, 2, 5000, (2024, 1, 10), "USD"),
        ];
        assert!(link_all(&statements).is_empty());
    }

    #[test]
    fn day_window_is_inclusive_of_seven() {
        let within = vec![tx(1, 1, -100, (2024, 5, 1)), tx(2, 2, 100, (2024, 5, 8))];
        assert_eq!(link_all(&within).len(), 1);

        let outside = vec![tx(1, 1, -100, (2024, 5, 1)), tx(2, 2, 100, (2024, 5, 9))];
        assert!(link_all(&outside).is_empty());
    }

    #[test]
    fn month_component_disqualifies_pair() {
        let statements = vec![tx(1, 1, -100, (2024, 1, 31)), tx(2, 2, 100, (2024, 3, 1))];
        assert!(link_all(&statements).is_empty());
    }

    #[test]
    fn short_span_across_month_boundary_links() {
        let statements = vec![tx(1, 1, -100, (2024, 1, 29)), tx(2, 2, 100, (2024, 2, 3))];
        assert_eq!(link_all(&statements), vec![link(1, 2)]);
    }

    #[test]
    fn picks_closest_date() {
        let statements = vec![
            tx(1, 1, -100, (2024, 6, 10)),
            tx(2, 2, 100, (2024, 6, 15)),
            tx(3, 3, 100, (2024, 6, 11)),
        ];
        assert_eq!(link_all(&statements), vec![link(1, 3)]);
    }

    #[test]
    fn ties_go_to_earliest_candidate() {
        let statements = vec![
            tx(1, 1, -100, (2024, 6, 10)),
            tx(2, 2, 100, (2024, 6, 12)),
            tx(3, 3, 100, (2024, 6, 8)),
        ];
        assert_eq!(link_all(&statements), vec![link(1, 2)]);
    }

    #[test]
    fn greedy_pairing_is_order_dependent() {
        // Statement 1 grabs 2 even though 3 would have paired with 2 exactly.
        let statements = vec![
            tx(1, 1, -100, (2024, 6, 10)),
            tx(2, 2, 100, (2024, 6, 12)),
            tx(3, 3, -100, (2024, 6, 12)),
        ];
        assert_eq!(link_all(&statements), vec![link(1, 2)]);
    }

    #[test]
    fn every_statement_is_linked_at_most_once() {
        let statements = vec![
            tx(1, 1, -100, (2024, 6, 10)),
            tx(2, 2, 100, (2024, 6, 10)),
            tx(3, 3, -100, (2024, 6, 10)),
            tx(4, 1, 100, (2024, 6, 11)),
            tx(5, 2, -100, (2024, 6, 11)),
        ];
        let links = link_all(&statements);
        let mut seen = HashSet::new();
        for l in &links {
            assert!(seen.insert(l.first_statement_id));
            assert!(seen.insert(l.second_statement_id));
        }
        assert_eq!(links, vec![link(1, 2), link(3, 4)]);
    }

    #[test]
    fn custom_day_span() {
        let statements = vec![tx(1, 1, -100, (2024, 5, 1)), tx(2, 2, 100, (2024, 5, 4))];
        assert!(TransferLinker::new(2).link_all(&statements).is_empty());
        assert_eq!(TransferLinker::new(3).link_all(&statements).len(), 1);
    }

    #[test]
    fn empty_input_yields_no_links() {
        assert!(link_all(&[]).is_empty());
    }
}
