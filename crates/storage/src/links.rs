use tally_core::{StatementId, StatementLink};

use crate::db::{DbPool, StorageError};

/// Swaps the stored link set for `links` in one transaction.
pub async fn replace_links(pool: &DbPool, links: &[StatementLink]) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM statement_links")
        .execute(&mut *tx)
        .await?;

    for link in links {
        sqlx::query(
            "INSERT INTO statement_links (first_statement_id, second_statement_id) VALUES (?, ?)",
        )
        .bind(link.first_statement_id.0)
        .bind(link.second_statement_id.0)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_links(pool: &DbPool) -> Result<Vec<StatementLink>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, i64)>(
        "SELECT first_statement_id, second_statement_id FROM statement_links \
         ORDER BY first_statement_id, second_statement_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| StatementLink::new(StatementId(r.0), StatementId(r.1)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::statements::insert_statement;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use tally_core::{AccountId, Amount, CategoryId, StatementRecord};

    async fn insert(pool: &DbPool, account: i64, cents: i64) -> StatementId {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let record = StatementRecord {
            account_id: AccountId(account),
            booking_date: date,
            value_date: date,
            transaction_type: "TRANSFER".to_string(),
            amount: Amount::from_cents(cents),
            currency: "EUR".to_string(),
            purpose: None,
            creditor_id: None,
            mandate_reference: None,
            customer_reference: None,
            payment_information_id: None,
            third_party_name: None,
            third_party_account: None,
            third_party_bank_code: None,
        };
        insert_statement(pool, &record, CategoryId(1), &BTreeSet::new())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn replace_discards_previous_links() {
        let (_dir, pool) = test_db().await;
        let a = insert(&pool, 1, -100).await;
        let b = insert(&pool, 2, 100).await;
        let c = insert(&pool, 3, 100).await;

        replace_links(&pool, &[StatementLink::new(a, b)]).await.unwrap();
        replace_links(&pool, &[StatementLink::new(a, c)]).await.unwrap();

        assert_eq!(get_links(&pool).await.unwrap(), vec![StatementLink::new(a, c)]);
    }

    #[tokio::test]
    async fn replace_with_nothing_clears() {
        let (_dir, pool) = test_db().await;
        let a = insert(&pool, 1, -100).await;
        let b = insert(&pool, 2, 100).await;
        replace_links(&pool, &[StatementLink::new(a, b)]).await.unwrap();
        replace_links(&pool, &[]).await.unwrap();
        assert!(get_links(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_replace_keeps_old_links() {
        let (_dir, pool) = test_db().await;
        let a = insert(&pool, 1, -100).await;
        let b = insert(&pool, 2, 100).await;
        replace_links(&pool, &[StatementLink::new(a, b)]).await.unwrap();

        let dangling = StatementLink::new(a, StatementId(999));
        assert!(replace_links(&pool, &[dangling]).await.is_err());
        assert_eq!(get_links(&pool).await.unwrap(), vec![StatementLink::new(a, b)]);
    }
}
