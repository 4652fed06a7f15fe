use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tally_core::{
    AccountId, CategoryId, Statement, StatementId, StatementRecord, TagId,
};
use tally_engine::{CategoryUpdate, Classification, TagUpdate};
use tracing::debug;

use crate::db::{parse_column, DbPool, StorageError};

const STATEMENT_COLUMNS: &str = "id, account_id, booking_date, value_date, type, amount, currency, \
    purpose, creditor_id, mandate_reference, customer_reference, payment_information_id, \
    third_party_name, third_party_account, third_party_bank_code, category_id, comment, \
    manual_category, manual_tags, state";

/// Stores a freshly imported record with its initial classification.
/// Returns `None` if a statement with the same identity hash already exists.
pub async fn insert_statement(
    pool: &DbPool,
    record: &StatementRecord,
    category_id: CategoryId,
    tag_ids: &BTreeSet<TagId>,
) -> Result<Option<StatementId>, StorageError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO statements (account_id, booking_date, value_date, type, amount, currency, \
         purpose, creditor_id, mandate_reference, customer_reference, payment_information_id, \
         third_party_name, third_party_account, third_party_bank_code, category_id, id_hash, content_hash) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.account_id.0)
    .bind(record.booking_date.to_string())
    .bind(record.value_date.to_string())
    .bind(&record.transaction_type)
    .bind(record.amount.to_string())
    .bind(&record.currency)
    .bind(&record.purpose)
    .bind(&record.creditor_id)
    .bind(&record.mandate_reference)
    .bind(&record.customer_reference)
    .bind(&record.payment_information_id)
    .bind(&record.third_party_name)
    .bind(&record.third_party_account)
    .bind(&record.third_party_bank_code)
    .bind(category_id.0)
    .bind(record.id_hash())
    .bind(record.content_hash())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let id = StatementId(result.last_insert_rowid());
    insert_tags(&mut tx, id, tag_ids).await?;
    tx.commit().await?;
    Ok(Some(id))
}

pub async fn get_statement(pool: &DbPool, id: StatementId) -> Result<Statement, StorageError> {
    let row = sqlx::query(&format!("SELECT {STATEMENT_COLUMNS} FROM statements WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or(StorageError::StatementNotFound(id))?;

    let tag_ids = sqlx::query_as::<_, (i64,)>(
        "SELECT tag_id FROM statement_tags WHERE statement_id = ? ORDER BY tag_id",
    )
    .bind(id.0)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| TagId(r.0))
    .collect();

    statement_from_row(&row, tag_ids)
}

/// Every statement in import order, with its tag associations.
pub async fn get_statements(pool: &DbPool) -> Result<Vec<Statement>, StorageError> {
    let mut tags: BTreeMap<i64, BTreeSet<TagId>> = BTreeMap::new();
    let tag_rows = sqlx::query_as::<_, (i64, i64)>("SELECT statement_id, tag_id FROM statement_tags")
        .fetch_all(pool)
        .await?;
    for (statement_id, tag_id) in tag_rows {
        tags.entry(statement_id).or_default().insert(TagId(tag_id));
    }

    let rows = sqlx::query(&format!("SELECT {STATEMENT_COLUMNS} FROM statements ORDER BY id"))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let id: i64 = row.try_get("id")?;
            statement_from_row(row, tags.remove(&id).unwrap_or_default())
        })
        .collect()
}

fn statement_from_row(row: &SqliteRow, tag_ids: BTreeSet<TagId>) -> Result<Statement, StorageError> {
    let record = StatementRecord {
        account_id: AccountId(row.try_get("account_id")?),
        booking_date: parse_date("booking_date", row.try_get("booking_date")?)?,
        value_date: parse_date("value_date", row.try_get("value_date")?)?,
        transaction_type: row.try_get("type")?,
        amount: parse_column("amount", row.try_get("amount")?)?,
        currency: row.try_get("currency")?,
        purpose: row.try_get("purpose")?,
        creditor_id: row.try_get("creditor_id")?,
        mandate_reference: row.try_get("mandate_reference")?,
        customer_reference: row.try_get("customer_reference")?,
        payment_information_id: row.try_get("payment_information_id")?,
        third_party_name: row.try_get("third_party_name")?,
        third_party_account: row.try_get("third_party_account")?,
        third_party_bank_code: row.try_get("third_party_bank_code")?,
    };

    Ok(Statement {
        id: StatementId(row.try_get("id")?),
        record,
        category_id: CategoryId(row.try_get("category_id")?),
        tag_ids,
        manual_category: row.try_get("manual_category")?,
        manual_tags: row.try_get("manual_tags")?,
        comment: row.try_get("comment")?,
        state: parse_column("state", row.try_get("state")?)?,
    })
}

fn parse_date(column: &'static str, value: String) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| StorageError::Corrupt { column, value })
}

async fn insert_tags(
    tx: &mut Transaction<'_, Sqlite>,
    statement_id: StatementId,
    tag_ids: &BTreeSet<TagId>,
) -> Result<(), sqlx::Error> {
    for tag_id in tag_ids {
        sqlx::query("INSERT INTO statement_tags (statement_id, tag_id) VALUES (?, ?)")
            .bind(statement_id.0)
            .bind(tag_id.0)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn replace_tags(
    tx: &mut Transaction<'_, Sqlite>,
    statement_id: StatementId,
    tag_ids: &BTreeSet<TagId>,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM statement_tags WHERE statement_id = ?")
        .bind(statement_id.0)
        .execute(&mut **tx)
        .await?;
    insert_tags(tx, statement_id, tag_ids).await
}

/// Writes classification results back. Each statement is updated in its own
/// transaction, so a failure leaves earlier statements fully applied and the
/// failing one untouched. Returns the number of statements written.
pub async fn apply_classifications(
    pool: &DbPool,
    classifications: &[Classification],
) -> Result<usize, StorageError> {
    let mut applied = 0;

    for c in classifications.iter().filter(|c| !c.is_unchanged()) {
        let mut tx = pool.begin().await?;

        if let TagUpdate::Replace(tag_ids) = &c.tags {
            replace_tags(&mut tx, c.statement_id, tag_ids).await?;
        }
        if let CategoryUpdate::Assign(category_id) = c.category {
            sqlx::query("UPDATE statements SET category_id = ? WHERE id = ?")
                .bind(category_id.0)
                .bind(c.statement_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(statement_id = %c.statement_id, "applied classification");
        applied += 1;
    }

    Ok(applied)
}

/// User override: pin (or unpin) a category on one statement.
pub async fn set_statement_category(
    pool: &DbPool,
    id: StatementId,
    category_id: CategoryId,
    manual: bool,
) -> Result<(), StorageError> {
    let result = sqlx::query("UPDATE statements SET category_id = ?, manual_category = ? WHERE id = ?")
        .bind(category_id.0)
        .bind(manual)
        .bind(id.0)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::StatementNotFound(id));
    }
    Ok(())
}

/// User override: replace the tag set of one statement and pin (or unpin) it.
pub async fn set_statement_tags(
    pool: &DbPool,
    id: StatementId,
    tag_ids: &BTreeSet<TagId>,
    manual: bool,
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE statements SET manual_tags = ? WHERE id = ?")
        .bind(manual)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::StatementNotFound(id));
    }
    replace_tags(&mut tx, id, tag_ids).await?;
    tx.commit().await?;
    Ok(())
}
