use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Corrupt value in column {column}: '{value}'")]
    Corrupt { column: &'static str, value: String },
    #[error("Statement not found: {0}")]
    StatementNotFound(tally_core::StatementId),
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA cache_size = -32000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category_id INTEGER,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Category and tag patterns share one table; `kind` tells them apart and
    // `target_id` holds the category or tag id.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS patterns (
            kind TEXT NOT NULL,
            id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            regex TEXT NOT NULL,
            match_mode TEXT NOT NULL,
            match_targets TEXT NOT NULL DEFAULT '[]',
            squish_data INTEGER NOT NULL DEFAULT 0,
            account_targets TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (kind, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No foreign key on category_id: a pinned statement may outlive its
    // category and is reassigned on the next classification run.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            booking_date TEXT NOT NULL,
            value_date TEXT NOT NULL,
            type TEXT NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            purpose TEXT,
            creditor_id TEXT,
            mandate_reference TEXT,
            customer_reference TEXT,
            payment_information_id TEXT,
            third_party_name TEXT,
            third_party_account TEXT,
            third_party_bank_code TEXT,
            category_id INTEGER NOT NULL,
            comment TEXT,
            id_hash TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            manual_category INTEGER NOT NULL DEFAULT 0,
            manual_tags INTEGER NOT NULL DEFAULT 0,
            state TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_statements_category ON statements(category_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statement_tags (
            statement_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (statement_id, tag_id),
            FOREIGN KEY (statement_id) REFERENCES statements(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statement_links (
            first_statement_id INTEGER NOT NULL,
            second_statement_id INTEGER NOT NULL,
            PRIMARY KEY (first_statement_id, second_statement_id),
            FOREIGN KEY (first_statement_id) REFERENCES statements(id) ON DELETE CASCADE,
            FOREIGN KEY (second_statement_id) REFERENCES statements(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Parses a stored text column, reporting the column on failure.
pub(crate) fn parse_column<T: std::str::FromStr>(
    column: &'static str,
    value: String,
) -> Result<T, StorageError> {
    value
        .parse()
        .map_err(|_| StorageError::Corrupt { column, value })
}

#[cfg(test)]
pub(crate) async fn test_db() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_db(&dir.path().join("test.db")).await.unwrap();
    (dir, pool)
}
